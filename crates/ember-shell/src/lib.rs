//! Embeddable command shell.
//!
//! The shell is a registry-based dispatch system. The host binds commands
//! and variables by name, then feeds it lines of text. Each line is split
//! into statements by the tokenizer, arguments are resolved (nested
//! `(sub evaluations)` run first) and converted to the declared parameter
//! types, and the bound callable runs. Everything a command produces goes to
//! a single output channel that the host drains.

mod builtins;
pub mod coerce;
mod interpreter;
pub mod manifest;
pub mod registry;
pub mod stack;
pub mod tokenizer;

/// Register all built-in commands (print, alias, var, if, repeat, ...) into a shell.
pub use builtins::register_builtins;
/// String-to-value conversion registry and its failure type.
pub use coerce::{CoercionRegistry, ParseFailure, Resolve};
/// The shell instance.
pub use interpreter::Shell;
/// Declarative host bindings.
pub use manifest::{HostField, HostMethod, HostTable, Manifest};
/// Bindings, parameters and the command traits.
pub use registry::{Args, Binding, BindingKind, Callable, Command, CommandRegistry, Param};
/// Call frames.
pub use stack::{ArgOrigin, Argument, CallFrame};

pub use ember_types::config::ShellConfig;
pub use ember_types::error::{Result, ShellError};
pub use ember_types::output::{Line, OutputChannel, Severity};
pub use ember_types::value::{Value, ValueType};
