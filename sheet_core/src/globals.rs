//! Global definitions loader
//!
//! The definitions resource uses document line syntax. Assignments and
//! function definitions are bound in order; lines that do not bind anything,
//! fail to parse, or evaluate to `Error` are skipped and the rest still load.

use crate::classify::{classify, LineKind};
use crate::line::split_lines;
use crate::scope::Scope;
use expr_core::ExpressionEngine;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default location of the definitions resource
pub const DEFAULT_GLOBALS_PATH: &str = "variables.md";

#[derive(Debug, Error)]
pub enum GlobalsError {
    #[error("Failed to read definitions from {path}: {message}")]
    Io { path: String, message: String },
}

/// Result of loading a definitions resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedGlobals {
    pub scope: Scope,
    /// Zero-based indices of binding lines that were dropped
    pub skipped_lines: Vec<usize>,
}

pub struct GlobalsLoader;

impl GlobalsLoader {
    pub fn load_from_str<E>(engine: &E, text: &str) -> LoadedGlobals
    where
        E: ExpressionEngine + ?Sized,
    {
        let mut loaded = LoadedGlobals::default();
        for (index, line) in split_lines(text).into_iter().enumerate() {
            match classify(line) {
                LineKind::FunctionDefinition(def) => {
                    if expr_core::parse(&def.body).is_ok() {
                        loaded.scope.define_function(def);
                    } else {
                        loaded.skipped_lines.push(index);
                    }
                }
                LineKind::Assignment { name, expr } => {
                    let value = engine.evaluate(&expr, &loaded.scope);
                    if value.is_error() {
                        loaded.skipped_lines.push(index);
                    } else {
                        loaded.scope.set_variable(name, value);
                    }
                }
                LineKind::BareEvalRequest { .. } | LineKind::Plain => {}
            }
        }
        tracing::debug!(
            variables = loaded.scope.variables().len(),
            functions = loaded.scope.functions().len(),
            skipped = loaded.skipped_lines.len(),
            "definitions loaded"
        );
        loaded
    }

    /// Loads the resource at `path`; a missing file yields an empty scope
    pub fn load_from_path<E>(engine: &E, path: impl AsRef<Path>) -> Result<LoadedGlobals, GlobalsError>
    where
        E: ExpressionEngine + ?Sized,
    {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no definitions resource");
            return Ok(LoadedGlobals::default());
        }
        let text = fs::read_to_string(path).map_err(|err| GlobalsError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Ok(Self::load_from_str(engine, &text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expr_core::{MathEngine, Value};
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_bad_lines_are_skipped() {
        let text = "# Constants\ng = 9.81\nbroken = 1 +\nhalf(x) = x / 2\nbad(x) = x +* 1\nweight = 70 * g\n2 + 2 =>";
        let loaded = GlobalsLoader::load_from_str(&MathEngine::new(), text);
        assert_eq!(loaded.skipped_lines, vec![2, 4]);
        assert_eq!(loaded.scope.get_variable("g"), Some(&Value::Number(9.81)));
        assert!(loaded.scope.get_function("half").is_some());
        assert!(loaded.scope.get_function("bad").is_none());
        assert!(loaded.scope.get_variable("broken").is_none());
        assert_eq!(
            loaded.scope.get_variable("weight").map(|v| v.to_string()),
            Some("686.7".to_string())
        );
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let loaded =
            GlobalsLoader::load_from_path(&MathEngine::new(), dir.path().join("variables.md"))
                .unwrap();
        assert!(loaded.scope.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "tax = 0.2").unwrap();
        writeln!(file, "net(x) = x * (1 - tax)").unwrap();
        let loaded = GlobalsLoader::load_from_path(&MathEngine::new(), file.path()).unwrap();
        assert_eq!(loaded.scope.variables().len(), 1);
        assert_eq!(loaded.scope.functions().len(), 1);
    }

    #[test]
    fn test_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let result = GlobalsLoader::load_from_path(&MathEngine::new(), dir.path());
        assert!(matches!(result, Err(GlobalsError::Io { .. })));
    }
}
