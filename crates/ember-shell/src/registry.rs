//! Bindings and the name → binding registry.
//!
//! A binding is a callable plus its parameter signature and metadata. Names
//! are case-insensitive: they are lower-cased on registration and lookup.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use ember_types::error::{Result, ShellError};
use ember_types::value::{Value, ValueType};

use crate::coerce::CoercionRegistry;
use crate::interpreter::Shell;
use crate::tokenizer::next_token;

/// Something the shell can invoke with bound arguments.
///
/// A `Some` result is emitted as an output line, which is also how an
/// enclosing sub-evaluation receives it.
pub trait Callable {
    fn call(&self, shell: &Shell, args: &Args) -> Result<Option<Value>>;
}

impl<F> Callable for F
where
    F: Fn(&Shell, &Args) -> Result<Option<Value>>,
{
    fn call(&self, shell: &Shell, args: &Args) -> Result<Option<Value>> {
        self(shell, args)
    }
}

/// A self-describing command, registered with [`Shell::register`].
pub trait Command {
    /// The command name (what the user types).
    fn name(&self) -> &str;

    /// One-line description for `help`.
    fn description(&self) -> &str;

    /// Usage string (e.g. "repeat <count> {block}").
    fn usage(&self) -> &str;

    /// Declared parameters, bound in order.
    fn parameters(&self) -> Vec<Param> {
        Vec::new()
    }

    fn execute(&self, shell: &Shell, args: &Args) -> Result<Option<Value>>;
}

struct CommandCallable(Box<dyn Command>);

impl Callable for CommandCallable {
    fn call(&self, shell: &Shell, args: &Args) -> Result<Option<Value>> {
        self.0.execute(shell, args)
    }
}

/// What a binding represents, mostly for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Command,
    Variable,
    Alias,
    /// Dispatched normally but left out of listings.
    Hidden,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BindingKind::Command => "command",
            BindingKind::Variable => "variable",
            BindingKind::Alias => "alias",
            BindingKind::Hidden => "hidden",
        };
        f.write_str(s)
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: ValueType,
    pub optional: bool,
    pub default: Option<Value>,
}

impl Param {
    pub fn required(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            optional: true,
            ..Self::required(name, ty)
        }
    }

    /// Make the parameter optional with a fallback value.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.optional = true;
        self.default = Some(value.into());
        self
    }

    fn signature(&self) -> String {
        if self.optional || self.ty.is_nullable() {
            format!("[{}:{}]", self.name, self.ty)
        } else {
            format!("<{}:{}>", self.name, self.ty)
        }
    }
}

/// Typed arguments handed to a callable, one per declared parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<Value>,
}

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// The argument at `index`, or `None` when it is absent or null.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).filter(|v| !v.is_null())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn text(&self, index: usize) -> Result<&str> {
        self.typed(index, "text", Value::as_text)
    }

    pub fn int(&self, index: usize) -> Result<i64> {
        self.typed(index, "int", Value::as_int)
    }

    pub fn float(&self, index: usize) -> Result<f64> {
        self.typed(index, "float", Value::as_float)
    }

    pub fn bool(&self, index: usize) -> Result<bool> {
        self.typed(index, "bool", Value::as_bool)
    }

    pub fn array(&self, index: usize) -> Result<&[Value]> {
        self.typed(index, "array", Value::as_array)
    }

    pub fn vector<const N: usize>(&self, index: usize) -> Result<[f64; N]> {
        self.typed(index, "vector", Value::as_vector::<N>)
    }

    fn typed<'a, T>(
        &'a self,
        index: usize,
        kind: &str,
        view: impl Fn(&'a Value) -> Option<T>,
    ) -> Result<T> {
        self.get(index).and_then(view).ok_or_else(|| {
            ShellError::Command(format!("argument {index} is not a {kind} value"))
        })
    }
}

/// Host predicate reporting whether a bound target still exists.
pub type Liveness = Rc<dyn Fn() -> bool>;

/// A registered command, variable or alias.
#[derive(Clone)]
pub struct Binding {
    callable: Rc<dyn Callable>,
    parameters: Vec<Param>,
    usage: Option<String>,
    description: Option<String>,
    kind: BindingKind,
    alias_target: Option<String>,
    liveness: Option<Liveness>,
}

impl Binding {
    /// A command backed by a closure.
    pub fn command<F>(f: F) -> Self
    where
        F: Fn(&Shell, &Args) -> Result<Option<Value>> + 'static,
    {
        Self::from_callable(Rc::new(f))
    }

    pub fn from_callable(callable: Rc<dyn Callable>) -> Self {
        Self {
            callable,
            parameters: Vec::new(),
            usage: None,
            description: None,
            kind: BindingKind::Command,
            alias_target: None,
            liveness: None,
        }
    }

    /// Wrap a self-describing [`Command`].
    pub fn from_command(cmd: Box<dyn Command>) -> Self {
        let parameters = cmd.parameters();
        let usage = cmd.usage().to_string();
        let description = cmd.description().to_string();
        Self::from_callable(Rc::new(CommandCallable(cmd)))
            .params(parameters)
            .usage(usage)
            .description(description)
    }

    /// A variable accessor: no argument emits the current value, one
    /// argument stores it.
    pub fn variable<G, S>(ty: ValueType, get: G, set: S) -> Self
    where
        G: Fn() -> Value + 'static,
        S: Fn(Value) -> Result<()> + 'static,
    {
        let mut b = Self::command(move |_, args| match args.get(0) {
            None => Ok(Some(get())),
            Some(v) => {
                set(v.clone())?;
                Ok(None)
            },
        });
        b.kind = BindingKind::Variable;
        b.param(Param::optional("value", ty))
    }

    /// A variable that rejects writes.
    pub fn readonly<G>(ty: ValueType, get: G) -> Self
    where
        G: Fn() -> Value + 'static,
    {
        Self::variable(ty, get, |_| {
            Err(ShellError::Command("variable is read-only".into()))
        })
    }

    /// A variable stored in a shared cell.
    pub fn cell(ty: ValueType, cell: Rc<RefCell<Value>>) -> Self {
        let reader = Rc::clone(&cell);
        Self::variable(
            ty,
            move || reader.borrow().clone(),
            move |v| {
                *cell.borrow_mut() = v;
                Ok(())
            },
        )
    }

    /// An alias that re-invokes `target` with its own arguments appended.
    /// The target is looked up when the alias runs, not when it is bound.
    pub fn alias(target: impl Into<String>) -> Self {
        let target = target.into();
        let line = target.clone();
        let mut b = Self::command(move |shell, _| {
            let forwarded = shell.current_frame()?.arguments;
            let mut statement = line.clone();
            for arg in &forwarded {
                statement.push(' ');
                statement.push_str(&quote_if_needed(&arg.text));
            }
            shell.eval_block(&statement)?;
            Ok(None)
        });
        b.kind = BindingKind::Alias;
        b.alias_target = Some(target);
        b
    }

    pub fn param(mut self, param: Param) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn params(mut self, params: Vec<Param>) -> Self {
        self.parameters.extend(params);
        self
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Exclude from listings.
    pub fn hidden(mut self) -> Self {
        self.kind = BindingKind::Hidden;
        self
    }

    /// Attach a liveness predicate checked before every dispatch.
    pub fn liveness(mut self, alive: impl Fn() -> bool + 'static) -> Self {
        self.liveness = Some(Rc::new(alive));
        self
    }

    pub(crate) fn with_liveness(mut self, alive: Option<Liveness>) -> Self {
        self.liveness = alive;
        self
    }

    pub fn callable(&self) -> &Rc<dyn Callable> {
        &self.callable
    }

    pub fn parameters(&self) -> &[Param] {
        &self.parameters
    }

    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn alias_target(&self) -> Option<&str> {
        self.alias_target.as_deref()
    }

    /// Whether the bound target still exists. Bindings without a predicate
    /// are always alive.
    pub fn is_alive(&self) -> bool {
        self.liveness.as_ref().is_none_or(|alive| alive())
    }

    /// The declared usage, or one derived from the parameters.
    pub fn usage_text(&self, name: &str) -> String {
        if let Some(u) = &self.usage {
            return u.clone();
        }
        let mut out = name.to_string();
        for p in &self.parameters {
            out.push(' ');
            out.push_str(&p.signature());
        }
        out
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("kind", &self.kind)
            .field("parameters", &self.parameters)
            .field("usage", &self.usage)
            .field("alias_target", &self.alias_target)
            .field("liveness", &self.liveness.is_some())
            .finish()
    }
}

/// Re-quote forwarded argument text that would otherwise be split or
/// re-scoped when the statement is tokenized again.
pub(crate) fn quote_if_needed(text: &str) -> String {
    const SPECIAL: &[char] = &[' ', '\t', ';', '(', ')', '{', '}', ':', ','];
    // Quotes cannot be escaped, so text holding them travels in a brace
    // group whenever that group reads back unchanged.
    if text.contains('"') {
        let grouped = format!("{{{text}}}");
        let verbatim = next_token(&grouped)
            .is_ok_and(|t| t.text == text && t.remainder.is_empty() && !t.end_of_statement);
        if verbatim {
            return grouped;
        }
    }
    if text.is_empty() || text.contains(SPECIAL) {
        format!("\"{text}\"")
    } else {
        text.to_string()
    }
}

/// Registry of bindings keyed by lower-cased name.
#[derive(Default)]
pub struct CommandRegistry {
    bindings: HashMap<String, Rc<Binding>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding, replacing any existing one with the same name.
    ///
    /// Fails without touching the registry if a parameter type has no
    /// conversion in `types`.
    pub fn register(&mut self, name: &str, binding: Binding, types: &CoercionRegistry) -> Result<()> {
        let key = name.trim().to_lowercase();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(ShellError::Command(format!("invalid binding name: '{name}'")));
        }
        if let Some(p) = binding.parameters.iter().find(|p| !types.supports(&p.ty)) {
            return Err(ShellError::UnsupportedType {
                name: key,
                param: p.name.clone(),
                ty: p.ty.to_string(),
            });
        }
        log::debug!("bind {key} ({})", binding.kind);
        if self.bindings.insert(key, Rc::new(binding)).is_some() {
            log::debug!("replaced existing binding '{name}'");
        }
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<Rc<Binding>> {
        self.bindings.remove(&name.to_lowercase())
    }

    pub fn lookup(&self, name: &str) -> Option<Rc<Binding>> {
        self.bindings.get(&name.to_lowercase()).map(Rc::clone)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(&name.to_lowercase())
    }

    /// Non-hidden bindings sorted by name.
    pub fn visible(&self) -> Vec<(String, Rc<Binding>)> {
        let mut out: Vec<(String, Rc<Binding>)> = self
            .bindings
            .iter()
            .filter(|(_, b)| b.kind != BindingKind::Hidden)
            .map(|(k, b)| (k.clone(), Rc::clone(b)))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Visible names starting with `partial`.
    pub fn completions(&self, partial: &str) -> Vec<String> {
        let lower = partial.to_lowercase();
        self.visible()
            .into_iter()
            .map(|(name, _)| name)
            .filter(|name| name.starts_with(&lower))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
