//! Document evaluation pass
//!
//! One forward sweep over every line. The scope starts as a copy of the seed
//! and accumulates bindings in document order, so a line only sees what
//! earlier lines (or the seed) bound.

use crate::classify::{classify_parts, LineKind};
use crate::line::{split_lines, split_marker, EVAL_MARKER};
use crate::scope::Scope;
use expr_core::{ExpressionEngine, Value};
use std::collections::BTreeMap;

/// Everything a pass produces
#[derive(Debug, Clone, PartialEq)]
pub struct PassOutput {
    /// Canonical text per line
    pub canonical: Vec<String>,
    /// Results keyed by zero-based line index
    pub results: BTreeMap<usize, Value>,
    /// Classification per line
    pub kinds: Vec<LineKind>,
    /// Scope after the last line
    pub scope: Scope,
    /// Number of results that are `Error`
    pub error_count: usize,
}

impl PassOutput {
    pub fn canonical_text(&self) -> String {
        self.canonical.join("\n")
    }

    pub fn result(&self, line: usize) -> Option<&Value> {
        self.results.get(&line)
    }

    pub fn line_count(&self) -> usize {
        self.canonical.len()
    }
}

/// Text written after the marker for a result
///
/// Line breaks inside a value are escaped so a result never splits its line.
pub fn result_text(value: &Value) -> String {
    let text = value.to_string();
    if text.contains(['\n', '\r']) {
        text.replace('\r', "\\r").replace('\n', "\\n")
    } else {
        text
    }
}

/// Runs one pass over `text`, starting from a copy of `seed`
pub fn evaluate_document<E>(engine: &E, seed: &Scope, text: &str) -> PassOutput
where
    E: ExpressionEngine + ?Sized,
{
    let lines = split_lines(text);
    let mut scope = seed.clone();
    let mut canonical = Vec::with_capacity(lines.len());
    let mut kinds = Vec::with_capacity(lines.len());
    let mut results = BTreeMap::new();

    for (index, line) in lines.iter().enumerate() {
        let parts = split_marker(line);
        let marked = parts.has_marker();
        let kind = classify_parts(parts.expr_part, marked);

        let result = match &kind {
            LineKind::FunctionDefinition(def) => {
                scope.define_function(def.clone());
                None
            }
            LineKind::Assignment { name, expr } => {
                let value = engine.evaluate(expr, &scope);
                scope.set_variable(name.clone(), value.clone());
                marked.then_some(value)
            }
            LineKind::BareEvalRequest { expr } => Some(engine.evaluate(expr, &scope)),
            LineKind::Plain => None,
        };

        let text = match (&kind, result) {
            (_, Some(value)) => {
                let text = format!("{} {} {}", parts.expr_part, EVAL_MARKER, result_text(&value));
                results.insert(index, value);
                text
            }
            (LineKind::FunctionDefinition(_), None) if marked => {
                format!("{} {}", parts.expr_part, EVAL_MARKER)
            }
            _ => line.to_string(),
        };
        canonical.push(text);
        kinds.push(kind);
    }

    let error_count = results.values().filter(|v| v.is_error()).count();
    tracing::debug!(
        lines = canonical.len(),
        results = results.len(),
        errors = error_count,
        "document pass complete"
    );

    PassOutput {
        canonical,
        results,
        kinds,
        scope,
        error_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expr_core::{Bindings, MathEngine};

    fn run(text: &str) -> PassOutput {
        evaluate_document(&MathEngine::new(), &Scope::new(), text)
    }

    /// Engine that echoes the expression text back as a string
    struct EchoEngine;

    impl ExpressionEngine for EchoEngine {
        fn evaluate(&self, expr: &str, _bindings: &dyn Bindings) -> Value {
            Value::String(expr.to_string())
        }
    }

    #[test]
    fn test_marker_round_trip() {
        assert_eq!(run("2 + 2 =>").canonical_text(), "2 + 2 => 4");
        assert_eq!(run("2 + 2 => 17").canonical_text(), "2 + 2 => 4");
        assert_eq!(run("2 + 2   =>   stale").canonical_text(), "2 + 2 => 4");
    }

    #[test]
    fn test_unmarked_lines_untouched() {
        let text = "x = 1 + 1  \nnotes (here)\n  y = x";
        assert_eq!(run(text).canonical_text(), text);
    }

    #[test]
    fn test_assignment_binds_without_marker() {
        let out = run("x = 4\nx * 2 =>");
        assert_eq!(out.canonical[1], "x * 2 => 8");
        assert!(out.result(0).is_none());
        assert_eq!(out.result(1), Some(&Value::Number(8.0)));
    }

    #[test]
    fn test_marked_function_definition_is_unannotated() {
        let out = run("f(x) = x^2 => 99\nf(3) =>");
        assert_eq!(out.canonical, vec!["f(x) = x^2 =>", "f(3) => 9"]);
        assert!(out.result(0).is_none());
    }

    #[test]
    fn test_later_lines_only() {
        let out = run("y = x + 1 =>\nx = 5");
        assert_eq!(out.canonical[0], "y = x + 1 => Error");
        assert_eq!(out.error_count, 1);
    }

    #[test]
    fn test_error_written_to_scope() {
        let out = run("a = 1\na = 1/0 =>\nb = a + 1 =>");
        assert_eq!(out.scope.get_variable("a"), Some(&Value::Error));
        assert_eq!(out.canonical[2], "b = a + 1 => Error");
    }

    #[test]
    fn test_seed_is_not_mutated() {
        let mut seed = Scope::new();
        seed.set_variable("rate", Value::Number(2.0));
        let out = evaluate_document(&MathEngine::new(), &seed, "rate = rate * 3 =>");
        assert_eq!(out.canonical[0], "rate = rate * 3 => 6");
        assert_eq!(seed.get_variable("rate"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_engine_is_swappable() {
        let out = evaluate_document(&EchoEngine, &Scope::new(), "a = 1 + 1 =>\nhello =>");
        assert_eq!(out.canonical, vec!["a = 1 + 1 => 1 + 1", "hello => hello"]);
    }

    #[test]
    fn test_multiline_value_is_escaped() {
        assert_eq!(run("\"a\\nb\" =>").canonical_text(), "\"a\\nb\" => a\\nb");
    }

    #[test]
    fn test_kinds_recorded() {
        let out = run("f(x) = x\nx = 1\nx =>\ntext");
        let labels: Vec<_> = out.kinds.iter().map(LineKind::label).collect();
        assert_eq!(labels, vec!["function", "assignment", "eval", "plain"]);
    }
}
