//! Core language definition for Golly
//!
//! This crate contains the fragments, syntax tokens, tagged values and
//! environments of the Golly S-expression language. It does not evaluate
//! anything; the binder, evaluator and builtins live in `golly-runtime`.

pub mod environment;
pub mod error;
pub mod interner;
pub mod lexer;
pub mod numeric;
pub mod parser;
pub mod value;

// Re-export commonly used items for convenience
pub use environment::{
    BindingRef, EnvBinding, Environment, FrameId, SystemEnvironment, init_builtins,
};
pub use error::{Error, ErrorCategory, ErrorKind, Result, Side};
pub use interner::Symbol;
pub use lexer::{Lexeme, tokenize};
pub use numeric::{ArithOp, ArithmeticError, Number, NumericKind};
pub use parser::{
    BindingKeyword, LiteralKind, MAX_NESTING, Token, TokenKind, parse, parse_program,
    parse_top_level_form,
};
pub use value::{Builtin, Function, Payload, Signature, TypeObject, TypeTag, Value};
