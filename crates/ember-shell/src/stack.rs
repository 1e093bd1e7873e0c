//! Call frames for in-flight dispatches.

use ember_types::error::{Result, ShellError};

/// Where an argument's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgOrigin {
    /// Written directly in the statement.
    Literal,
    /// Output of a sub-evaluation.
    SubEval,
}

/// Resolved argument text, not yet coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub text: String,
    pub origin: ArgOrigin,
}

impl Argument {
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: ArgOrigin::Literal,
        }
    }

    pub fn sub_eval(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: ArgOrigin::SubEval,
        }
    }
}

/// Arguments of one statement being dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub function_name: String,
    pub arguments: Vec<Argument>,
}

impl CallFrame {
    pub fn new(function_name: impl Into<String>, arguments: Vec<Argument>) -> Self {
        Self {
            function_name: function_name.into(),
            arguments,
        }
    }

    pub fn argument(&self, index: usize) -> Option<&Argument> {
        self.arguments.get(index)
    }

    /// Argument texts in order.
    pub fn texts(&self) -> Vec<&str> {
        self.arguments.iter().map(|a| a.text.as_str()).collect()
    }
}

/// LIFO stack of frames; depth equals the nesting of dispatches in flight.
#[derive(Debug, Default)]
pub struct CallStack {
    frames: Vec<CallFrame>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: CallFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }

    /// The innermost frame.
    pub fn current(&self) -> Result<&CallFrame> {
        self.frames.last().ok_or(ShellError::NoStackFrame)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
