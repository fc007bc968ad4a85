//! Bounded tail buffer for raw engine log lines.

use std::collections::VecDeque;

/// Default number of lines retained.
pub const DEFAULT_TAIL_LEN: usize = 20;

/// Keeps the last N raw diagnostic lines from the engine.
///
/// The engine is chatty during an invocation; the full stream goes to
/// `tracing` at debug level, while this buffer retains a short tail so a
/// failure can be diagnosed and a UI can show the latest line.
#[derive(Debug)]
pub struct LogTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl LogTail {
    /// Create a tail buffer retaining up to `capacity` lines.
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
        }
    }

    /// Append a line, evicting the oldest when full.
    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    /// The most recent line, if any.
    pub fn last(&self) -> Option<&str> {
        self.lines.back().map(|s| s.as_str())
    }

    /// All retained lines, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|s| s.as_str())
    }

    /// Retained lines joined with newlines, for error reports.
    pub fn joined(&self) -> String {
        self.lines
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of retained lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether no lines have been retained.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Drop all retained lines.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl Default for LogTail {
    fn default() -> Self {
        Self::new(DEFAULT_TAIL_LEN)
    }
}
