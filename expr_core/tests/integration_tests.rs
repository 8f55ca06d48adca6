//! Integration tests for the math engine
//!
//! These exercise the public surface the document pass relies on.

use expr_core::{
    Bindings, EmptyBindings, EvalError, ExpressionEngine, FunctionDefinition, MathEngine, Value,
};

struct Sheet {
    vars: Vec<(String, Value)>,
    funcs: Vec<FunctionDefinition>,
}

impl Bindings for Sheet {
    fn variable(&self, name: &str) -> Option<&Value> {
        self.vars.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    fn function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.funcs.iter().find(|f| f.name == name)
    }
}

fn render(expr: &str) -> String {
    MathEngine::new().evaluate(expr, &EmptyBindings).to_string()
}

#[test]
fn test_canonical_renderings() {
    assert_eq!(render("10 / 4"), "2.5");
    assert_eq!(render("1e21"), "1e21");
    assert_eq!(render("3 + 4i"), "3 + 4i");
    assert_eq!(render("-i"), "-i");
    assert_eq!(render("[1, 2] * 2"), "[2, 4]");
    assert_eq!(render("\"text\""), "text");
    assert_eq!(render("2 > 1"), "true");
}

#[test]
fn test_matrix_algebra() {
    assert_eq!(render("det([1, 2; 3, 4])"), "-2");
    assert_eq!(render("[1, 2; 3, 4] * [5; 6]"), "[[17], [39]]");
    assert_eq!(render("transpose([1, 2; 3, 4])"), "[[1, 3], [2, 4]]");
    assert_eq!(render("inv([1, 2; 2, 4])"), "Error");
}

#[test]
fn test_failures_collapse_to_error() {
    for expr in ["1 +", "(1", "foo(1)", "1 / 0", "\"a\" * 2", "[1, 2][5]", "(-1)!"] {
        assert_eq!(
            MathEngine::new().evaluate(expr, &EmptyBindings),
            Value::Error,
            "{}",
            expr
        );
    }
}

#[test]
fn test_functions_resolve_against_callers_scope() {
    let mut sheet = Sheet {
        vars: vec![("k".to_string(), Value::Number(1.0))],
        funcs: vec![FunctionDefinition::new(
            "f",
            vec!["x".to_string()],
            "x + k",
        )],
    };
    let engine = MathEngine::new();
    assert_eq!(engine.evaluate("f(2)", &sheet), Value::Number(3.0));

    sheet.vars[0].1 = Value::Number(10.0);
    assert_eq!(engine.evaluate("f(2)", &sheet), Value::Number(12.0));
}

#[test]
fn test_mutual_recursion_hits_depth_limit() {
    let sheet = Sheet {
        vars: Vec::new(),
        funcs: vec![
            FunctionDefinition::new("ping", vec!["n".to_string()], "pong(n)"),
            FunctionDefinition::new("pong", vec!["n".to_string()], "ping(n)"),
        ],
    };
    assert_eq!(
        MathEngine::new().try_evaluate("ping(1)", &sheet),
        Err(EvalError::CallDepthExceeded(expr_core::DEFAULT_MAX_CALL_DEPTH))
    );
}

#[test]
fn test_value_json_shape() {
    let json = serde_json::to_string(&Value::Number(2.0)).unwrap();
    assert_eq!(json, r#"{"type":"number","value":2.0}"#);
    let back: Value = serde_json::from_str(r#"{"type":"error"}"#).unwrap();
    assert_eq!(back, Value::Error);
}
