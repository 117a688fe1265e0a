//! The tagged runtime value.
//!
//! A [`Value`] pairs a closed [`Payload`] with a [`TypeTag`]. The payload
//! decides the natural type name; the tag only matters for untyped literals
//! and for user-named types, which do not map one-to-one onto a payload.

use std::fmt;
use std::rc::Rc;

use crate::environment::FrameId;
use crate::interner::Symbol;
use crate::numeric::{Number, NumericKind};
use crate::parser::Token;

pub const FUNCTION_TYPE_NAME: &str = "Function";
pub const ENVIRONMENT_TYPE_NAME: &str = "Environment";
pub const TYPE_TYPE_NAME: &str = "type";
pub const UNDECIDED_TYPE_NAME: &str = "undecided";

// ============================================================================
// Functions
// ============================================================================

/// Operation tags understood by the builtin dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Add,
    Sub,
    Mul,
    Div,
    If,
    Eval,
}

impl Builtin {
    pub const ALL: [Builtin; 6] = [
        Builtin::Add,
        Builtin::Sub,
        Builtin::Mul,
        Builtin::Div,
        Builtin::If,
        Builtin::Eval,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Add => "+",
            Builtin::Sub => "-",
            Builtin::Mul => "*",
            Builtin::Div => "/",
            Builtin::If => "if",
            Builtin::Eval => "eval",
        }
    }

    /// Fixed operand count
    pub fn arity(&self) -> usize {
        match self {
            Builtin::Eval => 1,
            _ => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    Builtin(Builtin),
    UserDefined { params: Vec<Symbol>, body: Vec<Token> },
}

impl Function {
    pub fn user_defined(params: &[&str], body: Vec<Token>) -> Self {
        Function::UserDefined {
            params: params.iter().map(|p| Symbol::intern(p)).collect(),
            body,
        }
    }
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

/// A named set of signatures. Two type objects are equal when their
/// signature sequences are identical; the name does not take part.
#[derive(Debug, Clone)]
pub struct TypeObject {
    pub name: String,
    pub signatures: Vec<Signature>,
}

impl TypeObject {
    pub fn new(name: impl Into<String>, signatures: Vec<Signature>) -> Self {
        TypeObject {
            name: name.into(),
            signatures,
        }
    }

    /// A value type: one signature with no inputs producing `name`.
    pub fn scalar(name: &str) -> Self {
        Self::new(
            name,
            vec![Signature {
                inputs: Vec::new(),
                outputs: vec![name.to_string()],
            }],
        )
    }

    /// Whether a payload whose natural type is `natural` can carry this type
    pub fn describes(&self, natural: &str) -> bool {
        self.signatures
            .iter()
            .any(|sig| sig.inputs.is_empty() && sig.outputs.len() == 1 && sig.outputs[0] == natural)
    }
}

impl PartialEq for TypeObject {
    fn eq(&self, other: &Self) -> bool {
        self.signatures == other.signatures
    }
}

// ============================================================================
// Values
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Number(Number),
    Bool(bool),
    Char(char),
    List(Vec<Value>),
    Function(Rc<Function>),
    Environment(FrameId),
    Type(Rc<TypeObject>),
    /// Content of a slot that has been added but not yet written
    Undecided,
}

impl Payload {
    pub fn natural_type_name(&self) -> &'static str {
        match self {
            Payload::Number(n) => n.kind().name(),
            Payload::Bool(_) => "bool",
            Payload::Char(_) => "char",
            Payload::List(_) => "list",
            Payload::Function(_) => FUNCTION_TYPE_NAME,
            Payload::Environment(_) => ENVIRONMENT_TYPE_NAME,
            Payload::Type(_) => TYPE_TYPE_NAME,
            Payload::Undecided => UNDECIDED_TYPE_NAME,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    /// The payload's own type
    Natural,
    /// An untyped literal; an annotation may still decide its type
    Undecided,
    /// A declared type that does not correspond to a payload variant
    Named(Symbol),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub payload: Payload,
    pub tag: TypeTag,
    pub mutable: bool,
}

impl Value {
    pub fn new(payload: Payload) -> Self {
        Value {
            payload,
            tag: TypeTag::Natural,
            mutable: false,
        }
    }

    pub fn number(n: Number) -> Self {
        Self::new(Payload::Number(n))
    }

    /// An untyped numeric literal
    pub fn literal(n: Number) -> Self {
        Value {
            tag: TypeTag::Undecided,
            ..Self::number(n)
        }
    }

    pub fn boolean(b: bool) -> Self {
        Self::new(Payload::Bool(b))
    }

    pub fn character(c: char) -> Self {
        Self::new(Payload::Char(c))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Self::new(Payload::List(items))
    }

    pub fn function(f: Function) -> Self {
        Self::new(Payload::Function(Rc::new(f)))
    }

    pub fn builtin(op: Builtin) -> Self {
        Self::function(Function::Builtin(op))
    }

    pub fn type_object(t: TypeObject) -> Self {
        Self::new(Payload::Type(Rc::new(t)))
    }

    pub fn undecided() -> Self {
        Self::new(Payload::Undecided)
    }

    pub fn with_mutable(mut self, mutable: bool) -> Self {
        self.mutable = mutable;
        self
    }

    pub fn type_name(&self) -> String {
        match self.tag {
            TypeTag::Named(name) => name.resolve(),
            TypeTag::Natural | TypeTag::Undecided => self.payload.natural_type_name().to_string(),
        }
    }

    pub fn is_undecided(&self) -> bool {
        self.tag == TypeTag::Undecided
    }

    pub fn is_function(&self) -> bool {
        matches!(self.payload, Payload::Function(_))
    }

    pub fn as_function(&self) -> Option<&Rc<Function>> {
        match &self.payload {
            Payload::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self.payload {
            Payload::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.payload {
            Payload::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match &self.payload {
            Payload::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&Rc<TypeObject>> {
        match &self.payload {
            Payload::Type(t) => Some(t),
            _ => None,
        }
    }

    /// Decide the type of an untyped literal.
    ///
    /// Builtin numeric types convert the payload to their width, so the type
    /// name keeps agreeing with what is stored. Other types only rename the
    /// value, and only when one of their signatures produces the payload's
    /// natural type. Returns `None` when the value cannot take the type.
    pub fn retag(&self, ty: &TypeObject) -> Option<Value> {
        if let Some(kind) = NumericKind::from_name(&ty.name) {
            let converted = self.as_number()?.convert_to(kind)?;
            return Some(Value {
                mutable: self.mutable,
                ..Value::number(converted)
            });
        }

        if ty.name == self.payload.natural_type_name() {
            return Some(Value {
                tag: TypeTag::Natural,
                ..self.clone()
            });
        }

        ty.describes(self.payload.natural_type_name())
            .then(|| Value {
                tag: TypeTag::Named(Symbol::intern(&ty.name)),
                ..self.clone()
            })
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::number(n)
    }
}

// ============================================================================
// Display Implementation
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.payload {
            Payload::Number(n) => write!(f, "{n}"),
            Payload::Bool(b) => write!(f, "{b}"),
            Payload::Char(c) => write!(f, "{c}"),
            Payload::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Payload::Function(func) => match func.as_ref() {
                Function::Builtin(op) => write!(f, "<builtin {}>", op.name()),
                Function::UserDefined { params, .. } => {
                    write!(f, "<function (")?;
                    for (i, param) in params.iter().enumerate() {
                        if i > 0 {
                            write!(f, " ")?;
                        }
                        write!(f, "{param}")?;
                    }
                    write!(f, ")>")
                }
            },
            Payload::Environment(frame) => write!(f, "<environment {}>", frame.index()),
            Payload::Type(t) => write!(f, "<type {}>", t.name),
            Payload::Undecided => write!(f, "{UNDECIDED_TYPE_NAME}"),
        }
    }
}
