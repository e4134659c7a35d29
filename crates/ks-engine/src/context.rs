//! Ambient execution state, carried as an explicit value.
//!
//! The context is reset per run; the user/connection selection it tracks
//! persists across segments unless a directive changes it. Keeping it a plain
//! value (rather than fields shared with the database layer) is what lets the
//! processor run against a mock database in tests.

use ks_db::DEFAULT_DATABASE;
use std::collections::HashSet;

/// Per-run processor state: pending start message, the ignore stack, and the
/// current database selection.
#[derive(Debug)]
pub struct ExecutionContext {
    start_message: Option<String>,
    /// Stack of IGNORE SQL ERROR code sets, LIFO.
    ignore_stack: Vec<Vec<String>>,
    /// Flattened view of the stack, rebuilt on push/pop.
    ignore_set: HashSet<String>,
    current_database: String,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            start_message: None,
            ignore_stack: Vec::new(),
            ignore_set: HashSet::new(),
            current_database: DEFAULT_DATABASE.to_string(),
        }
    }

    /// Reset to the run-start state.
    pub fn reset(&mut self) {
        self.start_message = None;
        self.ignore_stack.clear();
        self.ignore_set.clear();
        self.current_database = DEFAULT_DATABASE.to_string();
    }

    pub fn push_ignores(&mut self, codes: Vec<String>) {
        self.ignore_stack.push(codes);
        self.refresh_ignores();
    }

    /// Pop the most recent code set; `false` when the stack is empty.
    pub fn pop_ignores(&mut self) -> bool {
        let popped = self.ignore_stack.pop().is_some();
        self.refresh_ignores();
        popped
    }

    fn refresh_ignores(&mut self) {
        self.ignore_set = self
            .ignore_stack
            .iter()
            .flatten()
            .map(|code| code.to_ascii_uppercase())
            .collect();
    }

    /// Whether a database error code is in the active ignore set.
    pub fn is_ignored(&self, code: Option<&str>) -> bool {
        match code {
            Some(code) => self.ignore_set.contains(&code.to_ascii_uppercase()),
            None => false,
        }
    }

    pub fn set_start_message(&mut self, message: String) {
        self.start_message = Some(message);
    }

    /// The pending start message, consumed by the next persistent command.
    pub fn take_start_message(&mut self) -> Option<String> {
        self.start_message.take()
    }

    pub fn current_database(&self) -> &str {
        &self.current_database
    }

    pub fn select_database(&mut self, name: String) {
        self.current_database = name;
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}
