//! Output/error channel shared by commands and the evaluator.

use std::collections::VecDeque;

/// Severity of an emitted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Warning,
    Error,
    /// Echo of a submitted input line.
    Input,
}

/// One line of shell output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub severity: Severity,
}

impl Line {
    pub fn new(text: impl Into<String>, severity: Severity) -> Self {
        Self {
            text: text.into(),
            severity,
        }
    }

    pub fn normal(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Normal)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Error)
    }
}

/// Ordered, append-only log of lines.
///
/// Lines are drained FIFO by the host. The evaluator only ever takes the
/// most recent line, when it extracts a sub-evaluation's result.
#[derive(Debug, Clone, Default)]
pub struct OutputChannel {
    lines: VecDeque<Line>,
    /// Maximum retained lines (0 = unbounded).
    capacity: usize,
    /// Lines ever emitted, including dropped and popped ones.
    emitted: u64,
}

impl OutputChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel that drops its oldest lines beyond `capacity` (0 = unbounded).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Append a line.
    pub fn emit(&mut self, text: impl Into<String>, severity: Severity) {
        self.lines.push_back(Line::new(text, severity));
        self.emitted += 1;
        if self.capacity > 0 {
            while self.lines.len() > self.capacity {
                self.lines.pop_front();
            }
        }
    }

    /// Remove and return the most recently appended line.
    pub fn pop_last(&mut self) -> Option<Line> {
        self.lines.pop_back()
    }

    /// Read every retained line and reset the channel.
    pub fn drain_and_clear(&mut self) -> Vec<Line> {
        self.lines.drain(..).collect()
    }

    /// Retained lines, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Monotonic count of emitted lines.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}
