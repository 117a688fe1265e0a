//! Golly runtime - binder, evaluator and builtins
//!
//! This crate provides the execution side of Golly:
//! - the binder for `(name [: type] value)` groups
//! - a tree-walking evaluator over syntax tokens
//! - the builtin dispatcher (`+ - * / if eval`)
//!
//! Hosts hand a source string to [`parse_top_level_form`] and the resulting
//! token to [`evaluate`], getting back a value or a line-numbered error.

mod binder;
pub mod builtins;
pub mod interpreter;
pub mod options;

pub use golly::{Error, ErrorCategory, ErrorKind, Result, Token, Value, parse_top_level_form};
pub use interpreter::Interpreter;
pub use options::EvalOptions;

/// Evaluate one parsed form in a fresh interpreter.
pub fn evaluate(form: &Token) -> Result<Value> {
    Interpreter::new().evaluate(form)
}
