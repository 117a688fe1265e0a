//! Error types shared by the parser, binder and evaluator.
//!
//! Every failure is fatal to the enclosing top-level evaluation. The line and
//! the enclosing form ("caller") are structured fields so callers can match on
//! them without parsing messages.

use std::fmt;

use thiserror::Error;

/// The four failure families a host may want to tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Unbalanced parentheses
    Lex,
    /// Malformed literals and badly shaped top-level input
    Parse,
    /// Failures while binding `name [: type] value` groups
    Bind,
    /// Failures while evaluating forms and applying functions
    Eval,
}

/// Which operand of a binary builtin a type error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "first"),
            Side::Right => write!(f, "second"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    // Lex
    #[error("could not find matching parenthesis")]
    UnmatchedParen,

    // Parse
    #[error("malformed numeric literal `{0}`")]
    MalformedLiteral(String),
    #[error("expected exactly one top-level form, found {found}")]
    ExpectedSingleForm { found: usize },
    #[error("lists nested deeper than {0} levels")]
    NestingTooDeep(usize),

    // Bind
    #[error("attempting to assign to a non-identifier `{0}`")]
    AssignToNonIdentifier(String),
    #[error("attempting to assign to an immutable identifier `{0}`")]
    AssignToImmutable(String),
    #[error("nothing to assign to `{0}`")]
    MissingValue(String),
    #[error("unbound identifier `{0}`")]
    Unbound(String),
    #[error("assigning something that is not a type, but a {found}, to `{name}`")]
    NotAType { name: String, found: String },
    #[error("`{name}` is annotated as {expected} but the value is of type {found}")]
    TypeMismatch {
        name: String,
        expected: String,
        found: String,
    },
    #[error("reserved name `{0}` used as a value")]
    ReservedName(String),
    #[error("misplaced type annotation marker")]
    MisplacedMarker,

    // Eval
    #[error("cannot evaluate bare literal `{0}` in operator position")]
    LiteralInOperatorPosition(String),
    #[error("cannot evaluate an empty list")]
    EmptyForm,
    #[error("{keyword} takes a binding list and a body, got {found} arguments")]
    BindingFormArity { keyword: String, found: usize },
    #[error("expected a list but found `{0}`")]
    ExpectedList(String),
    #[error("unbound identifier `{0}` in operator position")]
    UnboundFunction(String),
    #[error("`{0}` in operator position does not name a function")]
    NotAFunction(String),
    #[error("{name} expects {expected} arguments, got {found}")]
    CallArity {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("{op}: types {left} and {right} are not compatible")]
    IncompatibleTypes {
        op: String,
        left: String,
        right: String,
    },
    #[error("{op}: expected the {side} operand to be {expected}, found {found}")]
    OperandType {
        op: String,
        side: Side,
        expected: String,
        found: String,
    },
    #[error("if: expected bool condition, found {0}")]
    NonBooleanCondition(String),
    #[error("if: expected a two-element branch list, found {0} elements")]
    MalformedBranches(usize),
    #[error("division by zero")]
    DivisionByZero,
    #[error("{op}: {kind} arithmetic overflowed")]
    Overflow { op: String, kind: String },
    #[error("recursion limit of {0} nested evaluations exceeded")]
    RecursionLimit(usize),
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        use ErrorKind::*;

        match self {
            UnmatchedParen => ErrorCategory::Lex,
            MalformedLiteral(_) | ExpectedSingleForm { .. } | NestingTooDeep(_) => {
                ErrorCategory::Parse
            }
            AssignToNonIdentifier(_)
            | AssignToImmutable(_)
            | MissingValue(_)
            | Unbound(_)
            | NotAType { .. }
            | TypeMismatch { .. }
            | ReservedName(_)
            | MisplacedMarker => ErrorCategory::Bind,
            LiteralInOperatorPosition(_)
            | EmptyForm
            | BindingFormArity { .. }
            | ExpectedList(_)
            | UnboundFunction(_)
            | NotAFunction(_)
            | CallArity { .. }
            | IncompatibleTypes { .. }
            | OperandType { .. }
            | NonBooleanCondition(_)
            | MalformedBranches(_)
            | DivisionByZero
            | Overflow { .. }
            | RecursionLimit(_) => ErrorCategory::Eval,
        }
    }
}

/// A fatal error with the source line and enclosing form it came from.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Error: {kind}, in {caller} at line {line}")]
pub struct Error {
    pub kind: ErrorKind,
    pub line: usize,
    pub caller: String,
}

impl Error {
    pub fn new(kind: ErrorKind, line: usize) -> Self {
        Self {
            kind,
            line,
            caller: String::from("toplevel"),
        }
    }

    /// Attach the name of the enclosing form.
    pub fn in_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = caller.into();
        self
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
