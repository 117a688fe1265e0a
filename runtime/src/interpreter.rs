use std::rc::Rc;

use golly::{
    BindingKeyword, BindingRef, Environment, Error, ErrorKind, FrameId, Function, LiteralKind,
    Number, Result, Symbol, SystemEnvironment, Token, TokenKind, Value, init_builtins,
    parse_program,
};
use tracing::{debug, trace};

use crate::builtins::{self, OperandMode};
use crate::options::EvalOptions;

// ============================================================================
// Interpreter
// ============================================================================

/// Tree-walking evaluator over one persistent root frame.
///
/// Binding forms and user-function calls push frames that are dropped again
/// when the form or call returns; `def` and `defm` write into the root frame
/// and so outlive the form that created them.
pub struct Interpreter {
    env: Environment,
    options: EvalOptions,
    depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_options(init_builtins(), EvalOptions::default())
    }

    /// Share an already initialised builtin table
    pub fn with_system(system: Rc<SystemEnvironment>) -> Self {
        Self::with_options(system, EvalOptions::default())
    }

    pub fn with_options(system: Rc<SystemEnvironment>, options: EvalOptions) -> Self {
        Interpreter {
            env: Environment::new(system),
            options,
            depth: 0,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    /// Bind `name` in the root frame, e.g. to install user-defined functions
    pub fn define_global(&mut self, name: &str, value: Value) {
        self.env.define_global(name, value);
    }

    /// Evaluate one top-level form. Lists are evaluated as forms; a bare
    /// identifier or literal evaluates to its value.
    pub fn evaluate(&mut self, form: &Token) -> Result<Value> {
        self.depth = 0;
        let result = self.eval_expr(FrameId::ROOT, form, "toplevel");
        self.env.pop_to(FrameId::ROOT);
        result
    }

    /// Parse `source` and evaluate each top-level form in order, returning the
    /// last value. Empty source evaluates to the empty list.
    pub fn evaluate_program(&mut self, source: &str) -> Result<Value> {
        let mut last = Value::list(Vec::new());
        for form in parse_program(source)? {
            last = self.evaluate(&form)?;
        }
        Ok(last)
    }

    // ========================================================================
    // Scoping helpers
    // ========================================================================

    fn nested<T>(
        &mut self,
        line: usize,
        caller: &str,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        if self.depth >= self.options.max_depth {
            return Err(
                Error::new(ErrorKind::RecursionLimit(self.options.max_depth), line)
                    .in_caller(caller),
            );
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn in_child_frame<T>(
        &mut self,
        parent: FrameId,
        f: impl FnOnce(&mut Self, FrameId) -> Result<T>,
    ) -> Result<T> {
        let frame = self.env.push_frame(parent);
        let result = f(self, frame);
        self.env.pop_to(frame);
        result
    }

    pub(crate) fn env(&self) -> &Environment {
        &self.env
    }

    pub(crate) fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Evaluate a token in value position.
    pub(crate) fn eval_expr(&mut self, frame: FrameId, token: &Token, caller: &str) -> Result<Value> {
        let fail = |kind: ErrorKind| -> Result<Value> {
            Err(Error::new(kind, token.line).in_caller(caller))
        };

        match &token.kind {
            TokenKind::Literal(kind) => {
                let number = match kind {
                    LiteralKind::FixedInteger => Number::parse_fixed(&token.text),
                    LiteralKind::FloatingPoint => Number::parse_floating(&token.text),
                };
                match number {
                    Some(n) => Ok(Value::literal(n)),
                    None => fail(ErrorKind::MalformedLiteral(token.text.clone())),
                }
            }
            TokenKind::Identifier => match self.env.lookup(frame, &token.text) {
                Some(value) => Ok(value.clone()),
                None => fail(ErrorKind::Unbound(token.text.clone())),
            },
            TokenKind::List(_) => self.eval_form(frame, token, caller),
            TokenKind::BindingKeyword(_) => fail(ErrorKind::ReservedName(token.text.clone())),
            TokenKind::TypeAnnotationMarker => fail(ErrorKind::MisplacedMarker),
        }
    }

    /// Evaluate a list token as a form, dispatching on its first element.
    fn eval_form(&mut self, frame: FrameId, token: &Token, caller: &str) -> Result<Value> {
        let children = token.children().unwrap_or_default();
        let Some(head) = children.first() else {
            return Err(Error::new(ErrorKind::EmptyForm, token.line).in_caller(caller));
        };
        let args = &children[1..];

        self.nested(head.line, caller, |this| match &head.kind {
            TokenKind::Literal(_) => Err(Error::new(
                ErrorKind::LiteralInOperatorPosition(head.text.clone()),
                head.line,
            )
            .in_caller(caller)),
            TokenKind::BindingKeyword(keyword) => {
                this.eval_binding_form(frame, *keyword, head.line, args)
            }
            TokenKind::Identifier => {
                let func = match this.env.lookup(frame, &head.text) {
                    Some(value) => value.clone(),
                    None => {
                        return Err(Error::new(
                            ErrorKind::UnboundFunction(head.text.clone()),
                            head.line,
                        )
                        .in_caller(caller));
                    }
                };
                this.apply(frame, &func, &head.text, head.line, args, caller)
            }
            TokenKind::List(_) => {
                let func = this.eval_form(frame, head, caller)?;
                this.apply(frame, &func, &head.to_string(), head.line, args, caller)
            }
            TokenKind::TypeAnnotationMarker => {
                Err(Error::new(ErrorKind::MisplacedMarker, head.line).in_caller(caller))
            }
        })
    }

    /// `(let|letm|def|defm (groups...) body)`
    fn eval_binding_form(
        &mut self,
        frame: FrameId,
        keyword: BindingKeyword,
        line: usize,
        args: &[Token],
    ) -> Result<Value> {
        let caller = keyword.as_str();
        if args.len() != 2 {
            return Err(Error::new(
                ErrorKind::BindingFormArity {
                    keyword: caller.to_string(),
                    found: args.len(),
                },
                line,
            )
            .in_caller(caller));
        }
        let (groups, body) = (&args[0], &args[1]);
        if !groups.is_list() {
            return Err(
                Error::new(ErrorKind::ExpectedList(groups.to_string()), groups.line)
                    .in_caller(caller),
            );
        }

        debug!(keyword = caller, line, "binding form");
        self.in_child_frame(frame, |this, scope| {
            this.bind_vars(
                groups,
                scope,
                keyword.is_global(),
                keyword.is_mutable(),
                caller,
            )?;
            this.eval_expr(scope, body, caller)
        })
    }

    // ========================================================================
    // Application
    // ========================================================================

    /// Apply `func` to unevaluated argument tokens. Call-site errors are
    /// reported against `caller`, the form containing the call.
    fn apply(
        &mut self,
        frame: FrameId,
        func: &Value,
        name: &str,
        line: usize,
        args: &[Token],
        caller: &str,
    ) -> Result<Value> {
        let Some(function) = func.as_function().cloned() else {
            return Err(
                Error::new(ErrorKind::NotAFunction(name.to_string()), line).in_caller(caller),
            );
        };

        match function.as_ref() {
            Function::Builtin(op) => {
                builtins::check_arity(*op, args.len(), line, caller)?;
                let mut operands = Vec::with_capacity(args.len());
                for (position, arg) in args.iter().enumerate() {
                    let operand = match builtins::operand_mode(*op, position) {
                        OperandMode::Value => self.eval_expr(frame, arg, op.name())?,
                        OperandMode::List => self.eval_elements(frame, arg, op.name())?,
                    };
                    operands.push(operand);
                }
                builtins::call(self, frame, *op, operands, line, caller)
            }
            Function::UserDefined { .. } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expr(frame, arg, name)?);
                }
                self.apply_values(frame, &function, name, line, values, caller)
            }
        }
    }

    /// Apply a function to already evaluated arguments.
    pub(crate) fn apply_values(
        &mut self,
        frame: FrameId,
        function: &Function,
        name: &str,
        line: usize,
        args: Vec<Value>,
        caller: &str,
    ) -> Result<Value> {
        match function {
            Function::Builtin(op) => builtins::call(self, frame, *op, args, line, caller),
            Function::UserDefined { params, body } => {
                if params.len() != args.len() {
                    return Err(Error::new(
                        ErrorKind::CallArity {
                            name: name.to_string(),
                            expected: params.len(),
                            found: args.len(),
                        },
                        line,
                    )
                    .in_caller(caller));
                }

                debug!(function = name, line, arity = params.len(), "calling function");
                self.nested(line, name, |this| {
                    this.in_child_frame(frame, |this, scope| {
                        for (param, arg) in params.iter().zip(args) {
                            this.bind_local(scope, *param, arg.with_mutable(false));
                        }
                        let mut result = Value::list(Vec::new());
                        for expr in body {
                            result = this.eval_expr(scope, expr, name)?;
                        }
                        Ok(result)
                    })
                })
            }
        }
    }

    /// Evaluate each element of a list token into a list value.
    fn eval_elements(&mut self, frame: FrameId, token: &Token, caller: &str) -> Result<Value> {
        let Some(items) = token.children() else {
            return Err(
                Error::new(ErrorKind::ExpectedList(token.to_string()), token.line)
                    .in_caller(caller),
            );
        };
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            values.push(self.eval_expr(frame, item, caller)?);
        }
        Ok(Value::list(values))
    }

    fn bind_local(&mut self, frame: FrameId, name: Symbol, value: Value) {
        let slot = match self.env.find_binding(frame, name, false, false) {
            Some(found @ BindingRef::Frame { .. }) => found,
            _ => self.env.add_binding(frame, false, name),
        };
        trace!(frame = frame.index(), name = %name, "parameter bound");
        self.env.write(&slot, value);
    }
}
