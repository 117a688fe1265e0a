use std::fmt;

use num_traits::{Float, NumCast, PrimInt};

// ============================================================================
// Numeric Type System
// ============================================================================

/// A number of one fixed width. `Int` and `Float` are the kinds untyped
/// literals start out as; the others only appear through annotations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f64),
    Float32(f32),
    Float64(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
    Float32,
    Float64,
}

impl NumericKind {
    /// Order in which binary operations try to match their operands.
    pub const PRIORITY: [NumericKind; 8] = [
        NumericKind::Int,
        NumericKind::Int64,
        NumericKind::Int32,
        NumericKind::Int16,
        NumericKind::Int8,
        NumericKind::Float,
        NumericKind::Float64,
        NumericKind::Float32,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NumericKind::Int => "int",
            NumericKind::Int8 => "int8",
            NumericKind::Int16 => "int16",
            NumericKind::Int32 => "int32",
            NumericKind::Int64 => "int64",
            NumericKind::Float => "float",
            NumericKind::Float32 => "float32",
            NumericKind::Float64 => "float64",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::PRIORITY.into_iter().find(|kind| kind.name() == name)
    }

    pub fn is_integer(&self) -> bool {
        !matches!(
            self,
            NumericKind::Float | NumericKind::Float32 | NumericKind::Float64
        )
    }
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticError {
    /// The right operand is not of the left operand's kind
    Mismatch {
        left: NumericKind,
        right: NumericKind,
    },
    DivisionByZero,
    Overflow(NumericKind),
}

// ============================================================================
// Display Implementation
// ============================================================================

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Number::Int(n) | Number::Int64(n) => write!(f, "{n}"),
            Number::Int8(n) => write!(f, "{n}"),
            Number::Int16(n) => write!(f, "{n}"),
            Number::Int32(n) => write!(f, "{n}"),
            Number::Float(x) | Number::Float64(x) => write!(f, "{x:?}"),
            Number::Float32(x) => write!(f, "{x:?}"),
        }
    }
}

// ============================================================================
// Width Helpers
// ============================================================================

fn int_op<T: PrimInt>(op: ArithOp, a: T, b: T, kind: NumericKind) -> Result<T, ArithmeticError> {
    let result = match op {
        ArithOp::Add => a.checked_add(&b),
        ArithOp::Sub => a.checked_sub(&b),
        ArithOp::Mul => a.checked_mul(&b),
        ArithOp::Div => {
            if b.is_zero() {
                return Err(ArithmeticError::DivisionByZero);
            }
            a.checked_div(&b)
        }
    };
    result.ok_or(ArithmeticError::Overflow(kind))
}

fn float_op<T: Float>(op: ArithOp, a: T, b: T) -> Result<T, ArithmeticError> {
    match op {
        ArithOp::Add => Ok(a + b),
        ArithOp::Sub => Ok(a - b),
        ArithOp::Mul => Ok(a * b),
        ArithOp::Div if b.is_zero() => Err(ArithmeticError::DivisionByZero),
        ArithOp::Div => Ok(a / b),
    }
}

fn narrow<T: NumCast, U: NumCast>(value: T) -> Option<U> {
    U::from(value)
}

impl Number {
    pub fn kind(&self) -> NumericKind {
        match self {
            Number::Int(_) => NumericKind::Int,
            Number::Int8(_) => NumericKind::Int8,
            Number::Int16(_) => NumericKind::Int16,
            Number::Int32(_) => NumericKind::Int32,
            Number::Int64(_) => NumericKind::Int64,
            Number::Float(_) => NumericKind::Float,
            Number::Float32(_) => NumericKind::Float32,
            Number::Float64(_) => NumericKind::Float64,
        }
    }

    /// Parse an integer literal's text into the untyped `int` kind
    pub fn parse_fixed(text: &str) -> Option<Number> {
        text.parse::<i64>().ok().map(Number::Int)
    }

    /// Parse a float literal's text into the untyped `float` kind
    pub fn parse_floating(text: &str) -> Option<Number> {
        text.parse::<f64>().ok().map(Number::Float)
    }

    /// Reinterpret an untyped literal as a number of `kind`.
    ///
    /// Integer literals convert to any integer width that can hold them, float
    /// literals to any float width. Everything else is `None`.
    pub fn convert_to(&self, kind: NumericKind) -> Option<Number> {
        match (*self, kind) {
            (Number::Int(n), NumericKind::Int) => Some(Number::Int(n)),
            (Number::Int(n), NumericKind::Int8) => narrow(n).map(Number::Int8),
            (Number::Int(n), NumericKind::Int16) => narrow(n).map(Number::Int16),
            (Number::Int(n), NumericKind::Int32) => narrow(n).map(Number::Int32),
            (Number::Int(n), NumericKind::Int64) => Some(Number::Int64(n)),
            (Number::Float(x), NumericKind::Float) => Some(Number::Float(x)),
            (Number::Float(x), NumericKind::Float32) => narrow(x)
                .filter(|y: &f32| y.is_finite() == x.is_finite())
                .map(Number::Float32),
            (Number::Float(x), NumericKind::Float64) => Some(Number::Float64(x)),
            (n, kind) if n.kind() == kind => Some(n),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        match *self {
            Number::Int(n) | Number::Int64(n) => n == 0,
            Number::Int8(n) => n == 0,
            Number::Int16(n) => n == 0,
            Number::Int32(n) => n == 0,
            Number::Float(x) | Number::Float64(x) => x == 0.0,
            Number::Float32(x) => x == 0.0,
        }
    }
}

// ============================================================================
// Arithmetic Operations
// ============================================================================

impl Number {
    /// Apply `op` to two numbers of the same width. No promotion or coercion
    /// happens: operands of different widths are a mismatch.
    pub fn apply(&self, op: ArithOp, other: &Number) -> Result<Number, ArithmeticError> {
        use Number::*;

        match (*self, *other) {
            (Int(a), Int(b)) => int_op(op, a, b, NumericKind::Int).map(Int),
            (Int64(a), Int64(b)) => int_op(op, a, b, NumericKind::Int64).map(Int64),
            (Int32(a), Int32(b)) => int_op(op, a, b, NumericKind::Int32).map(Int32),
            (Int16(a), Int16(b)) => int_op(op, a, b, NumericKind::Int16).map(Int16),
            (Int8(a), Int8(b)) => int_op(op, a, b, NumericKind::Int8).map(Int8),
            (Float(a), Float(b)) => float_op(op, a, b).map(Float),
            (Float64(a), Float64(b)) => float_op(op, a, b).map(Float64),
            (Float32(a), Float32(b)) => float_op(op, a, b).map(Float32),
            (left, right) => Err(ArithmeticError::Mismatch {
                left: left.kind(),
                right: right.kind(),
            }),
        }
    }

    pub fn add(&self, other: &Number) -> Result<Number, ArithmeticError> {
        self.apply(ArithOp::Add, other)
    }

    pub fn sub(&self, other: &Number) -> Result<Number, ArithmeticError> {
        self.apply(ArithOp::Sub, other)
    }

    pub fn mul(&self, other: &Number) -> Result<Number, ArithmeticError> {
        self.apply(ArithOp::Mul, other)
    }

    pub fn div(&self, other: &Number) -> Result<Number, ArithmeticError> {
        self.apply(ArithOp::Div, other)
    }
}
