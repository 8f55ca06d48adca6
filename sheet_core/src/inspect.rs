//! Variable listing for the inspection command

use crate::scope::Scope;

/// Shown when a scope holds no variables
pub const NO_VARIABLES_MESSAGE: &str = "No variables defined";

/// `name = value` per variable, one per line, sorted by name
pub fn list_variables(scope: &Scope) -> String {
    if scope.variables().is_empty() {
        return NO_VARIABLES_MESSAGE.to_string();
    }
    scope
        .variables()
        .iter()
        .map(|(name, value)| format!("{} = {}", name, value))
        .collect::<Vec<_>>()
        .join("\n")
}
