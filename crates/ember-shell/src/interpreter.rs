//! The evaluator: statement loop, sub-evaluation and dispatch.
//!
//! A [`Shell`] owns every piece of mutable state (registries, call stack,
//! output channel) behind `RefCell`s, so commands receive `&Shell` and can
//! re-enter it to evaluate nested blocks. No borrow is held while a
//! callable runs.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ember_types::config::ShellConfig;
use ember_types::error::{Result, ShellError};
use ember_types::output::{Line, OutputChannel, Severity};
use ember_types::value::{Value, ValueType};

use crate::builtins;
use crate::coerce::{CoercionRegistry, ParseFailure, Resolve};
use crate::registry::{Args, Binding, Command, CommandRegistry, Param};
use crate::stack::{ArgOrigin, Argument, CallFrame, CallStack};
use crate::tokenizer::{Token, TokenKind, next_statement};

/// An embeddable command shell instance.
pub struct Shell {
    config: ShellConfig,
    commands: RefCell<CommandRegistry>,
    types: RefCell<CoercionRegistry>,
    stack: RefCell<CallStack>,
    output: RefCell<OutputChannel>,
    /// Current evaluation nesting.
    depth: Cell<usize>,
}

impl Shell {
    /// Build a shell: built-ins, configured aliases, then startup statements.
    pub fn new(config: ShellConfig) -> Self {
        let shell = Self {
            output: RefCell::new(OutputChannel::with_capacity(config.max_output_lines)),
            commands: RefCell::new(CommandRegistry::new()),
            types: RefCell::new(CoercionRegistry::new()),
            stack: RefCell::new(CallStack::new()),
            depth: Cell::new(0),
            config,
        };
        if shell.config.builtins {
            builtins::register_builtins(&shell);
        }
        for (name, target) in &shell.config.aliases {
            if let Err(e) = shell.bind(name, Binding::alias(target.as_str())) {
                shell.report(&e);
            }
        }
        for statement in &shell.config.startup {
            if !shell.eval(statement) {
                log::warn!("startup statement failed: {statement}");
            }
        }
        log::info!(
            "Shell ready ({} bindings, max depth {})",
            shell.commands.borrow().len(),
            shell.config.max_depth
        );
        shell
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Tear the shell down, returning any output not yet drained.
    pub fn dispose(self) -> Vec<Line> {
        let lines = self.output.borrow_mut().drain_and_clear();
        log::info!("Shell disposed ({} undrained lines)", lines.len());
        lines
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    /// Evaluate a line of input. Returns `false` if any statement failed;
    /// the failure has been emitted as an `Error` line.
    pub fn eval(&self, input: &str) -> bool {
        if self.config.echo_input && self.depth.get() == 0 {
            self.emit(input, Severity::Input);
        }
        self.evaluate(input).is_ok()
    }

    /// Evaluate a nested block from inside a command.
    ///
    /// A failure has already been reported when this returns, so it comes
    /// back as [`ShellError::Aborted`] and the caller should just propagate
    /// it.
    pub fn eval_block(&self, text: &str) -> Result<()> {
        self.evaluate(text)
    }

    /// Run every statement of `input` at one deeper nesting level. Any error
    /// not yet reported is emitted here, exactly once.
    fn evaluate(&self, input: &str) -> Result<()> {
        let depth = self.depth.get();
        let result = if depth >= self.config.max_depth {
            Err(ShellError::RecursionLimit(self.config.max_depth))
        } else {
            self.depth.set(depth + 1);
            let r = self.run_statements(input);
            self.depth.set(depth);
            r
        };
        result.map_err(|e| {
            self.report(&e);
            ShellError::Aborted
        })
    }

    fn run_statements(&self, input: &str) -> Result<()> {
        let mut rest = input;
        while !rest.is_empty() {
            let (tokens, remainder) = next_statement(rest)?;
            rest = remainder;
            self.run_statement(&tokens)?;
        }
        Ok(())
    }

    fn run_statement(&self, tokens: &[Token<'_>]) -> Result<()> {
        let mut args = Vec::with_capacity(tokens.len());
        for token in tokens {
            args.push(self.resolve_token(token)?);
        }
        let mut args = args.into_iter();
        match args.next() {
            Some(name) if !name.text.is_empty() => self.dispatch(&name.text, args.collect()),
            _ => Ok(()),
        }
    }

    fn resolve_token(&self, token: &Token<'_>) -> Result<Argument> {
        match token.kind {
            TokenKind::SubEval => self.sub_evaluate(&token.text).map(Argument::sub_eval),
            TokenKind::Literal | TokenKind::Blank => Ok(Argument::literal(token.text.as_str())),
        }
    }

    /// Evaluate `expr` and take its most recent output line as the result.
    fn sub_evaluate(&self, expr: &str) -> Result<String> {
        let before = self.output.borrow().emitted();
        self.evaluate(expr)?;
        if self.output.borrow().emitted() == before {
            return Err(ShellError::VoidReturn(expr.to_string()));
        }
        self.output
            .borrow_mut()
            .pop_last()
            .map(|line| line.text)
            .ok_or_else(|| ShellError::VoidReturn(expr.to_string()))
    }

    fn dispatch(&self, name: &str, arguments: Vec<Argument>) -> Result<()> {
        self.stack.borrow_mut().push(CallFrame::new(name, arguments));
        let result = self.invoke(name);
        self.stack.borrow_mut().pop();
        result
    }

    fn invoke(&self, name: &str) -> Result<()> {
        let binding = self
            .lookup(name)
            .ok_or_else(|| ShellError::UndefinedLocal(name.to_string()))?;
        if !binding.is_alive() {
            self.commands.borrow_mut().remove(name);
            log::warn!("removed stale binding '{name}'");
            return Err(ShellError::Invalidated(name.to_string()));
        }

        let mut values = Vec::with_capacity(binding.parameters().len());
        for (index, param) in binding.parameters().iter().enumerate() {
            values.push(self.fetch(index, param)?);
        }
        log::debug!("dispatch {name} ({} args)", values.len());

        if let Some(value) = binding.callable().call(self, &Args::new(values))? {
            self.emit(value.to_string(), Severity::Normal);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Arguments
    // ------------------------------------------------------------------

    /// Bind the current frame's argument `index` to `param`.
    pub fn fetch(&self, index: usize, param: &Param) -> Result<Value> {
        let (command, argument) = {
            let stack = self.stack.borrow();
            let frame = stack.current()?;
            (frame.function_name.clone(), frame.argument(index).cloned())
        };

        let Some(argument) = argument else {
            if param.optional {
                return Ok(param.default.clone().unwrap_or(Value::Null));
            }
            if param.ty.is_nullable() {
                return Ok(Value::Null);
            }
            return Err(ShellError::RequiredArg {
                command,
                index,
                param: param.name.clone(),
            });
        };

        let parser = self.types.borrow().parser_for(&param.ty);
        let parser = parser.ok_or_else(|| ShellError::UnsupportedType {
            name: command.clone(),
            param: param.name.clone(),
            ty: param.ty.to_string(),
        })?;

        match parser(&argument.text, self) {
            Ok(value) => Ok(value),
            Err(ParseFailure::Resolve(e)) => Err(e),
            // A bad element produced by a nested sub-evaluation is a bad
            // return value even inside a literal array.
            Err(failure) if argument.origin == ArgOrigin::SubEval || failure.is_returned() => {
                Err(ShellError::ReturnType {
                    command,
                    index,
                    expected: param.ty.to_string(),
                    reason: failure.to_string(),
                })
            },
            Err(failure) => Err(ShellError::ArgType {
                command,
                index,
                param: param.name.clone(),
                expected: param.ty.to_string(),
                reason: failure.to_string(),
            }),
        }
    }

    /// A copy of the innermost call frame.
    pub fn current_frame(&self) -> Result<CallFrame> {
        self.stack.borrow().current().cloned()
    }

    /// Number of dispatches in flight.
    pub fn call_depth(&self) -> usize {
        self.stack.borrow().depth()
    }

    // ------------------------------------------------------------------
    // Bindings
    // ------------------------------------------------------------------

    /// Register `binding` under `name`, replacing any previous one.
    pub fn bind(&self, name: &str, binding: Binding) -> Result<()> {
        let result = {
            let types = self.types.borrow();
            self.commands.borrow_mut().register(name, binding, &types)
        };
        if let Err(e) = &result {
            log::warn!("rejected binding '{name}': {e}");
        }
        result
    }

    /// Register a self-describing command under its own name.
    pub fn register(&self, cmd: Box<dyn Command>) -> Result<()> {
        let name = cmd.name().to_string();
        self.bind(&name, Binding::from_command(cmd))
    }

    pub fn unbind(&self, name: &str) -> Option<Rc<Binding>> {
        self.commands.borrow_mut().remove(name)
    }

    pub fn lookup(&self, name: &str) -> Option<Rc<Binding>> {
        self.commands.borrow().lookup(name)
    }

    /// Visible bindings sorted by name.
    pub fn bindings(&self) -> Vec<(String, Rc<Binding>)> {
        self.commands.borrow().visible()
    }

    pub fn completions(&self, partial: &str) -> Vec<String> {
        self.commands.borrow().completions(partial)
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    /// Register or replace the conversion for a value type.
    pub fn register_type(
        &self,
        ty: ValueType,
        parser: impl Fn(&str, &dyn Resolve) -> std::result::Result<Value, ParseFailure> + 'static,
    ) {
        log::debug!("register type {ty}");
        self.types.borrow_mut().register_type(ty, parser);
    }

    pub fn supports(&self, ty: &ValueType) -> bool {
        self.types.borrow().supports(ty)
    }

    /// Convert `text` to `ty`, evaluating any sub-evaluations inside array
    /// elements.
    pub fn coerce(&self, ty: &ValueType, text: &str) -> std::result::Result<Value, ParseFailure> {
        let parser = self.types.borrow().parser_for(ty);
        let parser = parser.ok_or_else(|| ParseFailure::Unsupported(ty.to_string()))?;
        parser(text, self)
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    pub fn emit(&self, text: impl Into<String>, severity: Severity) {
        self.output.borrow_mut().emit(text, severity);
    }

    pub fn print(&self, text: impl Into<String>) {
        self.emit(text, Severity::Normal);
    }

    pub fn warn(&self, text: impl Into<String>) {
        self.emit(text, Severity::Warning);
    }

    /// Take every pending output line.
    pub fn drain_and_clear(&self) -> Vec<Line> {
        self.output.borrow_mut().drain_and_clear()
    }

    pub fn pop_last(&self) -> Option<Line> {
        self.output.borrow_mut().pop_last()
    }

    pub fn pending_lines(&self) -> usize {
        self.output.borrow().len()
    }

    fn report(&self, err: &ShellError) {
        if !err.is_reported() {
            log::debug!("error: {err}");
            self.emit(err.to_string(), Severity::Error);
        }
    }

    /// Emit the error of a failed host-facing operation, passing it through.
    pub(crate) fn reported<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.report(e);
        }
        result
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new(ShellConfig::default())
    }
}

/// Array elements resolve like statement arguments: a sub-evaluation is run,
/// anything else is unquoted.
impl Resolve for Shell {
    fn resolve(&self, expr: &str) -> Result<String> {
        self.sub_evaluate(expr)
    }
}
