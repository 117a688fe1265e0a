//! Binder for `(name [: type] value)` groups.
//!
//! Groups are read left to right. They may be written flat, `(a 1 b 2)`, or
//! one per sub-list, `((a 1) (b 2))`. A flat group is two tokens wide without
//! an annotation and four with one. The first malformed group aborts the
//! whole binding form.

use std::rc::Rc;

use golly::{
    BindingRef, Error, ErrorKind, FrameId, Result, Symbol, Token, TokenKind, TypeObject, Value,
};
use tracing::trace;

use crate::interpreter::Interpreter;

impl Interpreter {
    /// Bind every group in `list` into `scope`, or into the outermost frame of
    /// its chain when `global`. Values are evaluated in `scope`, so later
    /// groups see earlier ones.
    pub(crate) fn bind_vars(
        &mut self,
        list: &Token,
        scope: FrameId,
        global: bool,
        mutable: bool,
        caller: &str,
    ) -> Result<()> {
        let Some(items) = list.children() else {
            return Err(
                Error::new(ErrorKind::ExpectedList(list.to_string()), list.line).in_caller(caller),
            );
        };
        let target = if global {
            self.env().outermost(scope)
        } else {
            scope
        };
        self.bind_groups(items, scope, target, mutable, caller)
    }

    fn bind_groups(
        &mut self,
        items: &[Token],
        scope: FrameId,
        target: FrameId,
        mutable: bool,
        caller: &str,
    ) -> Result<()> {
        let mut i = 0;
        while i < items.len() {
            let name_token = &items[i];
            if let Some(group) = name_token.children() {
                self.bind_groups(group, scope, target, mutable, caller)?;
                i += 1;
                continue;
            }
            let fail = |kind: ErrorKind| Error::new(kind, name_token.line).in_caller(caller);

            if name_token.kind != TokenKind::Identifier {
                return Err(fail(ErrorKind::AssignToNonIdentifier(
                    name_token.to_string(),
                )));
            }
            let name = Symbol::intern(&name_token.text);

            self.rebindable_slot(target, name, name_token, caller)?;

            let Some(next) = items.get(i + 1) else {
                return Err(fail(ErrorKind::MissingValue(name_token.text.clone())));
            };

            let (annotation, value_token, width) = if next.kind == TokenKind::TypeAnnotationMarker {
                let (Some(type_token), Some(value_token)) = (items.get(i + 2), items.get(i + 3))
                else {
                    return Err(fail(ErrorKind::MissingValue(name_token.text.clone())));
                };
                let ty = self.resolve_annotation(scope, name_token, type_token, caller)?;
                (Some(ty), value_token, 4)
            } else {
                (None, next, 2)
            };

            let mut value = self.eval_expr(scope, value_token, caller)?;
            if let Some(ty) = annotation {
                value = self.check_annotation(scope, name_token, value, &ty, caller)?;
            }
            value.mutable = mutable;

            // The value may have bound `name` itself, so look again
            let slot = match self.rebindable_slot(target, name, name_token, caller)? {
                Some(found) => found,
                None => self.env_mut().add_binding(target, false, name),
            };
            trace!(
                name = %name,
                type_name = %value.type_name(),
                mutable,
                line = name_token.line,
                "binding committed"
            );
            self.env_mut().write(&slot, value);

            i += width;
        }

        Ok(())
    }

    /// Find the frame slot a binding of `name` into `target` would overwrite.
    /// An immutable binding anywhere on the chain blocks the rebinding.
    fn rebindable_slot(
        &self,
        target: FrameId,
        name: Symbol,
        name_token: &Token,
        caller: &str,
    ) -> Result<Option<BindingRef>> {
        let Some(found) = self.env().find_binding(target, name, true, true) else {
            return Ok(None);
        };
        if !self.env().value(&found).is_some_and(|v| v.mutable) {
            return Err(Error::new(
                ErrorKind::AssignToImmutable(name_token.text.clone()),
                name_token.line,
            )
            .in_caller(caller));
        }
        Ok(match found {
            BindingRef::Frame { .. } => Some(found),
            _ => None,
        })
    }

    /// Evaluate the token after `:` and require a type descriptor.
    fn resolve_annotation(
        &mut self,
        scope: FrameId,
        name_token: &Token,
        type_token: &Token,
        caller: &str,
    ) -> Result<Rc<TypeObject>> {
        let candidate = self.eval_expr(scope, type_token, caller)?;
        match candidate.as_type() {
            Some(ty) => Ok(Rc::clone(ty)),
            None => Err(Error::new(
                ErrorKind::NotAType {
                    name: name_token.text.clone(),
                    found: candidate.type_name(),
                },
                type_token.line,
            )
            .in_caller(caller)),
        }
    }

    /// Accept `value` for a binding annotated with `ty`.
    ///
    /// Untyped literals are retagged. Typed values must carry the annotated
    /// name already, or a name bound to a structurally equal type.
    fn check_annotation(
        &self,
        scope: FrameId,
        name_token: &Token,
        value: Value,
        ty: &TypeObject,
        caller: &str,
    ) -> Result<Value> {
        let found = value.type_name();
        let mismatch = || {
            Error::new(
                ErrorKind::TypeMismatch {
                    name: name_token.text.clone(),
                    expected: ty.name.clone(),
                    found: found.clone(),
                },
                name_token.line,
            )
            .in_caller(caller)
        };

        if value.is_undecided() {
            return value.retag(ty).ok_or_else(mismatch);
        }
        if found == ty.name {
            return Ok(value);
        }

        let same_structure = self
            .env()
            .lookup(scope, &found)
            .and_then(Value::as_type)
            .is_some_and(|own| own.as_ref() == ty);
        if same_structure {
            Ok(value)
        } else {
            Err(mismatch())
        }
    }
}

#[cfg(test)]
mod tests {
    use golly::{ErrorCategory, Number, parse_top_level_form};

    use super::*;

    fn bind(source: &str, global: bool, mutable: bool) -> (Interpreter, Result<()>) {
        let mut interp = Interpreter::new();
        let list = parse_top_level_form(source).unwrap();
        let result = interp.bind_vars(&list, FrameId::ROOT, global, mutable, "let");
        (interp, result)
    }

    #[test]
    fn test_binds_each_group_in_order() {
        let (interp, result) = bind("(a 1 b 2)", false, false);
        result.unwrap();
        let bindings = interp.environment().bindings(FrameId::ROOT);
        assert_eq!(bindings.len(), 2);
        assert!(bindings[0].name.is("a"));
        assert_eq!(bindings[1].value.as_number(), Some(Number::Int(2)));
    }

    #[test]
    fn test_parenthesised_groups() {
        let (interp, result) = bind("((a 1) (b : int8 2))", false, false);
        result.unwrap();
        let bindings = interp.environment().bindings(FrameId::ROOT);
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[1].value.as_number(), Some(Number::Int8(2)));
    }

    #[test]
    fn test_later_groups_see_earlier_ones() {
        let (interp, result) = bind("(a 1 b a)", false, false);
        result.unwrap();
        let b = interp.environment().lookup(FrameId::ROOT, "b").unwrap();
        assert_eq!(b.as_number(), Some(Number::Int(1)));
    }

    #[test]
    fn test_mutable_flag_is_stored() {
        let (interp, result) = bind("(a 1)", false, true);
        result.unwrap();
        assert!(interp.environment().lookup(FrameId::ROOT, "a").unwrap().mutable);
    }

    #[test]
    fn test_non_identifier_name() {
        let (_, result) = bind("((1 2))", false, false);
        let err = result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AssignToNonIdentifier("1".into()));
        assert_eq!(err.category(), ErrorCategory::Bind);
        assert_eq!(err.caller, "let");
    }

    #[test]
    fn test_immutable_rebinding_fails() {
        let (_, result) = bind("(a 1 a 2)", false, false);
        assert_eq!(
            result.unwrap_err().kind,
            ErrorKind::AssignToImmutable("a".into())
        );
    }

    #[test]
    fn test_mutable_rebinding_updates_slot() {
        let (interp, result) = bind("(a 1 a 2)", false, true);
        result.unwrap();
        let bindings = interp.environment().bindings(FrameId::ROOT);
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].value.as_number(), Some(Number::Int(2)));
    }

    #[test]
    fn test_value_that_binds_the_same_name() {
        let (interp, result) = bind("(x (def ((x 1)) x))", true, true);
        assert_eq!(
            result.unwrap_err().kind,
            ErrorKind::AssignToImmutable("x".into())
        );
        assert_eq!(interp.environment().bindings(FrameId::ROOT).len(), 1);

        let (interp, result) = bind("(x (defm ((x 1)) (+ x 1)))", true, true);
        result.unwrap();
        let bindings = interp.environment().bindings(FrameId::ROOT);
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].value.as_number(), Some(Number::Int(2)));
    }

    #[test]
    fn test_builtins_cannot_be_rebound() {
        let (_, result) = bind("(+ 1)", false, true);
        assert_eq!(
            result.unwrap_err().kind,
            ErrorKind::AssignToImmutable("+".into())
        );
    }

    #[test]
    fn test_missing_value() {
        let (_, result) = bind("(a)", false, false);
        assert_eq!(result.unwrap_err().kind, ErrorKind::MissingValue("a".into()));

        let (_, result) = bind("(a : int)", false, false);
        assert_eq!(result.unwrap_err().kind, ErrorKind::MissingValue("a".into()));
    }

    #[test]
    fn test_unbound_value() {
        let (_, result) = bind("(a b)", false, false);
        assert_eq!(result.unwrap_err().kind, ErrorKind::Unbound("b".into()));
    }

    #[test]
    fn test_reserved_name_and_marker_as_value() {
        let (_, result) = bind("(a let)", false, false);
        assert_eq!(result.unwrap_err().kind, ErrorKind::ReservedName("let".into()));

        let (_, result) = bind("(a : : 1)", false, false);
        assert_eq!(result.unwrap_err().kind, ErrorKind::MisplacedMarker);
    }

    #[test]
    fn test_annotation_retags_literal() {
        let (interp, result) = bind("(a : int32 7)", false, false);
        result.unwrap();
        let a = interp.environment().lookup(FrameId::ROOT, "a").unwrap();
        assert_eq!(a.type_name(), "int32");
        assert_eq!(a.as_number(), Some(Number::Int32(7)));
    }

    #[test]
    fn test_annotation_must_name_a_type() {
        let (_, result) = bind("(t 1 a : t 2)", false, false);
        assert_eq!(
            result.unwrap_err().kind,
            ErrorKind::NotAType {
                name: "a".into(),
                found: "int".into()
            }
        );
    }

    #[test]
    fn test_annotation_type_mismatch() {
        let (_, result) = bind("(a : int 1.5)", false, false);
        assert_eq!(
            result.unwrap_err().kind,
            ErrorKind::TypeMismatch {
                name: "a".into(),
                expected: "int".into(),
                found: "float".into()
            }
        );
    }

    #[test]
    fn test_typed_value_must_match_annotation() {
        let (_, result) = bind("(a : int16 1 b : int32 a)", false, false);
        assert_eq!(
            result.unwrap_err().kind,
            ErrorKind::TypeMismatch {
                name: "b".into(),
                expected: "int32".into(),
                found: "int16".into()
            }
        );

        let (_, result) = bind("(a : int16 1 b : int16 a)", false, false);
        result.unwrap();
    }

    #[test]
    fn test_alias_type_is_structurally_equal() {
        let (interp, result) = bind("(num int a : num 3)", false, false);
        result.unwrap();
        let a = interp.environment().lookup(FrameId::ROOT, "a").unwrap();
        assert_eq!(a.type_name(), "int");
    }

    #[test]
    fn test_global_binding_lands_in_outermost_frame() {
        let mut interp = Interpreter::new();
        let inner = interp.env_mut().push_frame(FrameId::ROOT);
        let list = parse_top_level_form("(g 5)").unwrap();
        interp.bind_vars(&list, inner, true, false, "def").unwrap();
        assert_eq!(interp.environment().bindings(FrameId::ROOT).len(), 1);
        assert!(interp.environment().bindings(inner).is_empty());
    }
}
