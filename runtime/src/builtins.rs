//! Builtin dispatcher for `+ - * / if eval`.
//!
//! The evaluator decides how each operand is produced (see [`operand_mode`]);
//! everything here works on values.

use golly::{
    ArithOp, ArithmeticError, Builtin, Error, ErrorKind, FrameId, Function, Number, Result, Side,
    TypeTag, Value,
};
use tracing::debug;

use crate::interpreter::Interpreter;

/// How the evaluator turns an argument token into an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandMode {
    /// Evaluate the token as an expression
    Value,
    /// The token must be a list; evaluate each element into a list value
    List,
}

/// The branch pair of `if` and the call list of `eval` are written inline,
/// so they are evaluated element-wise instead of as forms.
pub fn operand_mode(op: Builtin, position: usize) -> OperandMode {
    match (op, position) {
        (Builtin::If, 1) | (Builtin::Eval, 0) => OperandMode::List,
        _ => OperandMode::Value,
    }
}

/// Fail unless `found` operands match the builtin's fixed arity. The error is
/// reported against `caller`, the form the call appears in.
pub fn check_arity(op: Builtin, found: usize, line: usize, caller: &str) -> Result<()> {
    if found == op.arity() {
        return Ok(());
    }
    Err(Error::new(
        ErrorKind::CallArity {
            name: op.name().to_string(),
            expected: op.arity(),
            found,
        },
        line,
    )
    .in_caller(caller))
}

/// Run a builtin on already produced operands.
pub fn call(
    interp: &mut Interpreter,
    frame: FrameId,
    op: Builtin,
    operands: Vec<Value>,
    line: usize,
    caller: &str,
) -> Result<Value> {
    check_arity(op, operands.len(), line, caller)?;
    debug!(op = op.name(), line, "builtin call");

    let mut operands = operands.into_iter();
    match (op, operands.next(), operands.next()) {
        (Builtin::Add, Some(a), Some(b)) => arithmetic(ArithOp::Add, &a, &b, line),
        (Builtin::Sub, Some(a), Some(b)) => arithmetic(ArithOp::Sub, &a, &b, line),
        (Builtin::Mul, Some(a), Some(b)) => arithmetic(ArithOp::Mul, &a, &b, line),
        (Builtin::Div, Some(a), Some(b)) => arithmetic(ArithOp::Div, &a, &b, line),
        (Builtin::If, Some(condition), Some(branches)) => choose(&condition, &branches, line),
        (Builtin::Eval, Some(call_list), None) => eval_list(interp, frame, &call_list, line),
        // check_arity has already rejected every other shape
        _ => Err(Error::new(
            ErrorKind::CallArity {
                name: op.name().to_string(),
                expected: op.arity(),
                found: 0,
            },
            line,
        )
        .in_caller(caller)),
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

fn arithmetic(op: ArithOp, a: &Value, b: &Value, line: usize) -> Result<Value> {
    let name = op.symbol();
    let fail = |kind: ErrorKind| Error::new(kind, line).in_caller(name);

    let (left_type, right_type) = (a.type_name(), b.type_name());
    if left_type != right_type {
        return Err(fail(ErrorKind::IncompatibleTypes {
            op: name.to_string(),
            left: left_type,
            right: right_type,
        }));
    }

    let operand = |side: Side, value: &Value| -> Result<Number> {
        value.as_number().ok_or_else(|| {
            fail(ErrorKind::OperandType {
                op: name.to_string(),
                side,
                expected: "a number".to_string(),
                found: value.type_name(),
            })
        })
    };
    let left = operand(Side::Left, a)?;
    let right = operand(Side::Right, b)?;

    let result = left.apply(op, &right).map_err(|err| {
        fail(match err {
            ArithmeticError::Mismatch { left, right } => ErrorKind::OperandType {
                op: name.to_string(),
                side: Side::Right,
                expected: left.to_string(),
                found: right.to_string(),
            },
            ArithmeticError::DivisionByZero => ErrorKind::DivisionByZero,
            ArithmeticError::Overflow(kind) => ErrorKind::Overflow {
                op: name.to_string(),
                kind: kind.to_string(),
            },
        })
    })?;

    // Only literal-on-literal arithmetic stays untyped
    let tag = match (a.tag, b.tag) {
        (TypeTag::Undecided, other) => other,
        (own, _) => own,
    };
    Ok(Value {
        tag,
        mutable: a.mutable,
        ..Value::number(result)
    })
}

// ============================================================================
// Control
// ============================================================================

/// `(if condition (then else))`
fn choose(condition: &Value, branches: &Value, line: usize) -> Result<Value> {
    let fail = |kind: ErrorKind| Error::new(kind, line).in_caller("if");

    let Some(flag) = condition.as_bool() else {
        return Err(fail(ErrorKind::NonBooleanCondition(condition.type_name())));
    };
    let Some(items) = branches.as_list() else {
        return Err(fail(ErrorKind::ExpectedList(branches.to_string())));
    };
    match items {
        [then, otherwise] => Ok(if flag { then.clone() } else { otherwise.clone() }),
        _ => Err(fail(ErrorKind::MalformedBranches(items.len()))),
    }
}

/// `(eval (f args...))` applies the evaluated head to the evaluated rest.
fn eval_list(
    interp: &mut Interpreter,
    frame: FrameId,
    call_list: &Value,
    line: usize,
) -> Result<Value> {
    let fail = |kind: ErrorKind| Error::new(kind, line).in_caller("eval");

    let Some(items) = call_list.as_list() else {
        return Err(fail(ErrorKind::ExpectedList(call_list.to_string())));
    };
    let Some((head, rest)) = items.split_first() else {
        return Err(fail(ErrorKind::EmptyForm));
    };
    let Some(function) = head.as_function().cloned() else {
        return Err(fail(ErrorKind::NotAFunction(head.to_string())));
    };

    let name = match function.as_ref() {
        Function::Builtin(op) => op.name().to_string(),
        Function::UserDefined { .. } => head.to_string(),
    };
    interp.apply_values(frame, &function, &name, line, rest.to_vec(), "eval")
}

#[cfg(test)]
mod tests {
    use golly::{NumericKind, Symbol};

    use super::*;

    fn run(op: Builtin, operands: Vec<Value>) -> Result<Value> {
        let mut interp = Interpreter::new();
        call(&mut interp, FrameId::ROOT, op, operands, 1, "let")
    }

    fn int32(n: i32) -> Value {
        Value::number(Number::Int32(n))
    }

    #[test]
    fn test_operand_modes() {
        assert_eq!(operand_mode(Builtin::Add, 1), OperandMode::Value);
        assert_eq!(operand_mode(Builtin::If, 0), OperandMode::Value);
        assert_eq!(operand_mode(Builtin::If, 1), OperandMode::List);
        assert_eq!(operand_mode(Builtin::Eval, 0), OperandMode::List);
    }

    #[test]
    fn test_add_keeps_left_type_and_mutability() {
        let a = int32(40).with_mutable(true);
        let result = run(Builtin::Add, vec![a, int32(2)]).unwrap();
        assert_eq!(result.as_number(), Some(Number::Int32(42)));
        assert_eq!(result.type_name(), "int32");
        assert!(result.mutable);
    }

    #[test]
    fn test_literals_stay_undecided() {
        let result = run(
            Builtin::Mul,
            vec![Value::literal(Number::Int(6)), Value::literal(Number::Int(7))],
        )
        .unwrap();
        assert_eq!(result.tag, TypeTag::Undecided);
        assert_eq!(result.as_number(), Some(Number::Int(42)));
    }

    #[test]
    fn test_typed_operand_decides_result_tag() {
        let literal = Value::literal(Number::Int(1));
        let typed = Value::number(Number::Int(5));
        for operands in [
            vec![literal.clone(), typed.clone()],
            vec![typed.clone(), literal.clone()],
        ] {
            let result = run(Builtin::Add, operands).unwrap();
            assert_eq!(result.tag, TypeTag::Natural);
            assert!(!result.is_undecided());
        }

        let named = Value {
            tag: TypeTag::Named(Symbol::intern("meters")),
            ..Value::number(Number::Int(2))
        };
        let literal = Value {
            tag: TypeTag::Named(Symbol::intern("meters")),
            ..Value::literal(Number::Int(3))
        };
        let result = run(Builtin::Mul, vec![literal, named]).unwrap();
        assert_eq!(result.type_name(), "meters");
    }

    #[test]
    fn test_incompatible_types() {
        let err = run(Builtin::Sub, vec![int32(1), Value::number(Number::Int(1))]).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::IncompatibleTypes {
                op: "-".into(),
                left: "int32".into(),
                right: "int".into()
            }
        );
        assert_eq!(err.caller, "-");
    }

    #[test]
    fn test_non_numeric_operand() {
        let err = run(Builtin::Add, vec![Value::boolean(true), Value::boolean(false)]).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::OperandType {
                op: "+".into(),
                side: Side::Left,
                expected: "a number".into(),
                found: "bool".into()
            }
        );
    }

    #[test]
    fn test_division_by_zero() {
        let err = run(Builtin::Div, vec![int32(1), int32(0)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivisionByZero);

        let zero = Value::number(Number::Float(0.0));
        let err = run(Builtin::Div, vec![Value::number(Number::Float(1.0)), zero]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivisionByZero);
    }

    #[test]
    fn test_overflow() {
        let a = Value::number(Number::Int8(100));
        let b = Value::number(Number::Int8(100));
        let err = run(Builtin::Add, vec![a, b]).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::Overflow {
                op: "+".into(),
                kind: NumericKind::Int8.to_string()
            }
        );
    }

    #[test]
    fn test_if_selects_branch() {
        let branches = Value::list(vec![int32(1), int32(2)]);
        let taken = run(Builtin::If, vec![Value::boolean(true), branches.clone()]).unwrap();
        assert_eq!(taken.as_number(), Some(Number::Int32(1)));
        let taken = run(Builtin::If, vec![Value::boolean(false), branches]).unwrap();
        assert_eq!(taken.as_number(), Some(Number::Int32(2)));
    }

    #[test]
    fn test_if_rejects_bad_operands() {
        let branches = Value::list(vec![int32(1), int32(2)]);
        let err = run(Builtin::If, vec![int32(1), branches]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NonBooleanCondition("int32".into()));

        let err = run(
            Builtin::If,
            vec![Value::boolean(true), Value::list(vec![int32(1)])],
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedBranches(1));
    }

    #[test]
    fn test_eval_applies_head() {
        let call_list = Value::list(vec![Value::builtin(Builtin::Sub), int32(5), int32(3)]);
        let result = run(Builtin::Eval, vec![call_list]).unwrap();
        assert_eq!(result.as_number(), Some(Number::Int32(2)));
    }

    #[test]
    fn test_eval_requires_function_head() {
        let err = run(Builtin::Eval, vec![Value::list(vec![int32(5)])]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotAFunction("5".into()));

        let err = run(Builtin::Eval, vec![Value::list(Vec::new())]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::EmptyForm);
    }

    #[test]
    fn test_arity() {
        let err = run(Builtin::Add, vec![int32(1)]).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::CallArity {
                name: "+".into(),
                expected: 2,
                found: 1
            }
        );
        assert_eq!(err.caller, "let");
    }
}
