//! Declarative host bindings.
//!
//! The host fills a [`HostTable`] with the members it is willing to expose,
//! keyed `object.member` (or a bare name for globals). A [`Manifest`], usually
//! loaded from TOML, says which of those members become shell commands and
//! variables:
//!
//! ```toml
//! [[command]]
//! name = "heal"
//! method = "player.heal"
//! description = "Restore health"
//!
//! [[variable]]
//! name = "hp"
//! field = "player.health"
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use serde::Deserialize;

use ember_types::error::{Result, ShellError};
use ember_types::value::{Value, ValueType};

use crate::interpreter::Shell;
use crate::registry::{Args, Binding, Callable, Liveness, Param};

type Getter = Rc<dyn Fn() -> Value>;
type Setter = Rc<dyn Fn(Value) -> Result<()>>;

/// A readable (and optionally writable) host value.
#[derive(Clone)]
pub struct HostField {
    ty: ValueType,
    get: Getter,
    set: Option<Setter>,
}

impl HostField {
    pub fn new<G, S>(ty: ValueType, get: G, set: S) -> Self
    where
        G: Fn() -> Value + 'static,
        S: Fn(Value) -> Result<()> + 'static,
    {
        Self {
            ty,
            get: Rc::new(get),
            set: Some(Rc::new(set)),
        }
    }

    /// A field with no setter. It can only be bound read-only.
    pub fn constant<G>(ty: ValueType, get: G) -> Self
    where
        G: Fn() -> Value + 'static,
    {
        Self {
            ty,
            get: Rc::new(get),
            set: None,
        }
    }

    pub fn is_constant(&self) -> bool {
        self.set.is_none()
    }
}

/// A host procedure with its parameter signature.
#[derive(Clone)]
pub struct HostMethod {
    params: Vec<Param>,
    callable: Rc<dyn Callable>,
}

impl HostMethod {
    pub fn new<F>(params: Vec<Param>, f: F) -> Self
    where
        F: Fn(&Shell, &Args) -> Result<Option<Value>> + 'static,
    {
        Self {
            params,
            callable: Rc::new(f),
        }
    }
}

/// Members the host exposes for binding.
#[derive(Default)]
pub struct HostTable {
    objects: HashMap<String, Liveness>,
    fields: HashMap<String, HostField>,
    methods: HashMap<String, HostMethod>,
}

impl HostTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an object whose members are valid while `alive` holds.
    pub fn add_object(&mut self, name: &str, alive: impl Fn() -> bool + 'static) -> &mut Self {
        self.objects.insert(name.to_string(), Rc::new(alive));
        self
    }

    pub fn add_field(&mut self, path: &str, field: HostField) -> &mut Self {
        self.fields.insert(path.to_string(), field);
        self
    }

    pub fn add_method(&mut self, path: &str, method: HostMethod) -> &mut Self {
        self.methods.insert(path.to_string(), method);
        self
    }

    /// Liveness of the object owning `path`, if the path has one.
    fn liveness_for(&self, path: &str) -> Option<Liveness> {
        let (object, _) = path.split_once('.')?;
        self.objects.get(object).map(Rc::clone)
    }

    fn command_binding(&self, entry: &CommandEntry) -> Result<Binding> {
        let method = self
            .methods
            .get(&entry.method)
            .ok_or_else(|| ShellError::UndefinedMethod(entry.method.clone()))?;
        let mut binding = Binding::from_callable(Rc::clone(&method.callable))
            .params(method.params.clone())
            .with_liveness(self.liveness_for(&entry.method));
        if let Some(usage) = &entry.usage {
            binding = binding.usage(usage.as_str());
        }
        if let Some(desc) = &entry.description {
            binding = binding.description(desc.as_str());
        }
        if entry.hidden {
            binding = binding.hidden();
        }
        Ok(binding)
    }

    fn variable_binding(&self, entry: &VariableEntry) -> Result<Binding> {
        let field = self
            .fields
            .get(&entry.field)
            .ok_or_else(|| ShellError::UndefinedField(entry.field.clone()))?;
        let get = Rc::clone(&field.get);
        let mut binding = match (&field.set, entry.readonly) {
            (_, true) => Binding::readonly(field.ty.clone(), move || get()),
            (Some(set), false) => {
                let set = Rc::clone(set);
                Binding::variable(field.ty.clone(), move || get(), move |v| set(v))
            },
            (None, false) => return Err(ShellError::StaticField(entry.field.clone())),
        };
        binding = binding.with_liveness(self.liveness_for(&entry.field));
        if let Some(desc) = &entry.description {
            binding = binding.description(desc.as_str());
        }
        if entry.hidden {
            binding = binding.hidden();
        }
        Ok(binding)
    }
}

/// One `[[command]]` entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandEntry {
    pub name: String,
    pub method: String,
    #[serde(default)]
    pub usage: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub hidden: bool,
}

/// One `[[variable]]` entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableEntry {
    pub name: String,
    pub field: String,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub hidden: bool,
}

/// Bindings to create from a [`HostTable`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    #[serde(rename = "command")]
    pub commands: Vec<CommandEntry>,
    #[serde(rename = "variable")]
    pub variables: Vec<VariableEntry>,
}

impl Manifest {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        log::debug!("Loaded manifest from {}", path.display());
        Self::from_toml(&text)
    }

    pub fn len(&self) -> usize {
        self.commands.len() + self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.variables.is_empty()
    }
}

impl Shell {
    /// Bind every manifest entry against `host`, commands first.
    ///
    /// Stops at the first failure, which is also emitted as an error line.
    /// Entries bound before it stay bound. Returns the number of bindings
    /// created.
    pub fn bind_manifest(&self, manifest: &Manifest, host: &HostTable) -> Result<usize> {
        let mut bound = 0;
        for entry in &manifest.commands {
            let result = host
                .command_binding(entry)
                .and_then(|b| self.bind(&entry.name, b));
            self.reported(result)?;
            bound += 1;
        }
        for entry in &manifest.variables {
            let result = host
                .variable_binding(entry)
                .and_then(|b| self.bind(&entry.name, b));
            self.reported(result)?;
            bound += 1;
        }
        log::info!("Bound {bound} host members from manifest");
        Ok(bound)
    }
}
