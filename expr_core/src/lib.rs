//! # Expression Core
//!
//! The math engine behind calcsheet documents.
//!
//! ## Philosophy
//!
//! - **Errors are values**: callers receive [`Value::Error`], never a panic
//! - **Explicit bindings**: every name resolves through a [`Bindings`] handed in by the caller
//! - **Deterministic**: same expression and bindings => same value
//!
//! ## Design
//!
//! The crate provides:
//! - ExpressionEngine: the seam document passes evaluate through
//! - MathEngine: the built-in engine (numbers, complex, matrices, strings)
//! - FunctionDefinition: a user function as recorded by the document pass
//! - Value: evaluation results and their canonical text form

pub mod builtins;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod ops;
pub mod parser;
pub mod value;

use serde::{Deserialize, Serialize};

pub use error::{EvalError, EvalResult};
pub use eval::{MathEngine, DEFAULT_MAX_CALL_DEPTH, MAX_CALL_DEPTH};
pub use parser::{parse, Expr, MAX_NESTING};
pub use value::{format_number, Complex, Matrix, Shape, Value};

/// A user-defined function: `name(params) = body`
///
/// The body is kept as source text and parsed each time the function is
/// called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub params: Vec<String>,
    pub body: String,
}

impl FunctionDefinition {
    pub fn new(name: impl Into<String>, params: Vec<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params,
            body: body.into(),
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// `name(a, b)`
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.params.join(", "))
    }
}

/// Name resolution for an evaluation
pub trait Bindings {
    fn variable(&self, name: &str) -> Option<&Value>;
    fn function(&self, name: &str) -> Option<&FunctionDefinition>;
}

/// Bindings with nothing in them
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyBindings;

impl Bindings for EmptyBindings {
    fn variable(&self, _name: &str) -> Option<&Value> {
        None
    }

    fn function(&self, _name: &str) -> Option<&FunctionDefinition> {
        None
    }
}

/// Evaluates expression text to a value
///
/// Implementations must not panic. Any failure is reported as
/// [`Value::Error`].
pub trait ExpressionEngine {
    fn evaluate(&self, expr: &str, bindings: &dyn Bindings) -> Value;
}

/// Evaluates `expr` with the default [`MathEngine`]
pub fn evaluate(expr: &str, bindings: &dyn Bindings) -> Value {
    MathEngine::new().evaluate(expr, bindings)
}
