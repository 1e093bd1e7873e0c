//! Error types for Ember.

use std::io;

/// Errors produced by the Ember shell.
///
/// Every variant is recoverable. The evaluator reports a failure once to the
/// output channel (using the `Display` text below) and surfaces it to the
/// host as a `false` result.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("cannot bind '{name}': parameter '{param}' has unsupported type {ty}")]
    UnsupportedType {
        name: String,
        param: String,
        ty: String,
    },

    #[error("undefined command or variable: {0}")]
    UndefinedLocal(String),

    #[error("unexpected end of input: missing '{0}'")]
    UnexpectedEof(char),

    #[error("undefined field: {0}")]
    UndefinedField(String),

    #[error("undefined method: {0}")]
    UndefinedMethod(String),

    #[error("field '{0}' is constant and must be bound read-only")]
    StaticField(String),

    #[error("{command}: argument {index} ({param}) expects {expected}: {reason}")]
    ArgType {
        command: String,
        index: usize,
        param: String,
        expected: String,
        reason: String,
    },

    #[error("{command}: missing required argument {index} ({param})")]
    RequiredArg {
        command: String,
        index: usize,
        param: String,
    },

    #[error("no active call frame")]
    NoStackFrame,

    #[error("{command}: value returned for argument {index} is not {expected}: {reason}")]
    ReturnType {
        command: String,
        index: usize,
        expected: String,
        reason: String,
    },

    #[error("'{0}' returned no value")]
    VoidReturn(String),

    #[error("'{0}' is no longer valid and has been removed")]
    Invalidated(String),

    #[error("evaluation nested deeper than {0} levels")]
    RecursionLimit(usize),

    #[error("{0}")]
    Command(String),

    /// A nested evaluation failed and has already reported its own error.
    #[error("evaluation aborted")]
    Aborted,

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl ShellError {
    /// Whether this failure was already written to the output channel.
    pub fn is_reported(&self) -> bool {
        matches!(self, ShellError::Aborted)
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ShellError>;
