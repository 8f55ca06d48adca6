//! Variable and function bindings

use expr_core::{Bindings, FunctionDefinition, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Names bound at a point in document order
///
/// A later write to a name replaces the earlier one for everything that
/// follows. Variables and functions live in separate namespaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    variables: BTreeMap<String, Value>,
    functions: BTreeMap<String, FunctionDefinition>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn define_function(&mut self, def: FunctionDefinition) {
        self.functions.insert(def.name.clone(), def);
    }

    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn get_function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.get(name)
    }

    pub fn variables(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }

    pub fn functions(&self) -> &BTreeMap<String, FunctionDefinition> {
        &self.functions
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() && self.functions.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Bindings for Scope {
    fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    fn function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.get(name)
    }
}
