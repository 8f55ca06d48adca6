//! Evaluator error types

use thiserror::Error;

/// Errors raised while lexing, parsing or evaluating an expression
///
/// These never leave the evaluator through [`crate::ExpressionEngine`]; they
/// collapse to [`crate::Value::Error`] at that boundary.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    /// Character that starts no token
    #[error("Unexpected character '{ch}' at offset {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    /// String literal without a closing quote
    #[error("Unterminated string literal starting at offset {0}")]
    UnterminatedString(usize),

    /// Numeric literal that does not parse as f64
    #[error("Invalid number literal: {0}")]
    InvalidNumber(String),

    /// Grammar violation
    #[error("Parse error at offset {pos}: {message}")]
    Parse { pos: usize, message: String },

    /// Nothing to evaluate
    #[error("Empty expression")]
    EmptyExpression,

    /// Identifier with no binding and no constant
    #[error("Undefined symbol: {0}")]
    UndefinedSymbol(String),

    /// Call to a name that is neither user-defined nor builtin
    #[error("Undefined function: {0}")]
    UndefinedFunction(String),

    /// Wrong number of arguments
    #[error("Function {name} expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    /// Operand of the wrong kind
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Matrix shapes that do not line up
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Division or modulo by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Argument outside the function's domain
    #[error("Domain error: {0}")]
    Domain(String),

    /// Index outside a vector or matrix
    #[error("Index out of range: {0}")]
    IndexOutOfRange(String),

    /// Too many nested user function calls
    #[error("Maximum call depth of {0} exceeded")]
    CallDepthExceeded(usize),

    /// Expression deeper than the parser or evaluator accepts
    #[error("Expression nested too deeply (limit {0})")]
    NestingTooDeep(usize),

    /// Reference to a binding that already holds an error
    #[error("Operand '{0}' holds an error value")]
    ErrorOperand(String),
}

/// Result type for evaluator internals
pub type EvalResult<T> = Result<T, EvalError>;

impl EvalError {
    pub(crate) fn parse(pos: usize, message: impl Into<String>) -> Self {
        EvalError::Parse {
            pos,
            message: message.into(),
        }
    }

    pub(crate) fn type_mismatch(message: impl Into<String>) -> Self {
        EvalError::TypeMismatch(message.into())
    }
}
