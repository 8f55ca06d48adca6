//! # Sheet Core
//!
//! Turns document text into evaluated, canonical calculator text.
//!
//! ## Philosophy
//!
//! - **Document order is scope order**: a line sees only what earlier lines bound
//! - **Fresh scope per pass**: the seed is copied, never mutated
//! - **Failures stay local**: a bad line renders `Error` and the pass goes on
//! - **Engine agnostic**: evaluation goes through [`expr_core::ExpressionEngine`]
//!
//! ## Design
//!
//! The core provides:
//! - classify: the three ordered line rules
//! - evaluate_document: one forward pass producing a [`PassOutput`]
//! - GlobalsLoader: the seed scope from the definitions resource
//! - list_variables: the inspection listing

pub mod classify;
pub mod globals;
pub mod inspect;
pub mod line;
pub mod pass;
pub mod scope;

pub use classify::{classify, LineKind};
pub use globals::{GlobalsError, GlobalsLoader, LoadedGlobals, DEFAULT_GLOBALS_PATH};
pub use inspect::{list_variables, NO_VARIABLES_MESSAGE};
pub use line::{caret_after_marker, split_lines, split_marker, LineParts, EVAL_MARKER};
pub use pass::{evaluate_document, result_text, PassOutput};
pub use scope::Scope;
