//! Per-query observation transcript.
//!
//! The context is the only state that survives from one reasoning step to the
//! next. It is append-only: entries are formatted in full before they are
//! pushed, so an entry is either entirely present or absent.

use serde_json::Value;

use crate::error::RpcError;

/// Append-only buffer of observations and errors for one query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Context {
    text: String,
    entries: usize,
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful tool result as `\nObservation: <json>`.
    pub fn push_observation(&mut self, result: &Value) {
        // Serializing a `Value` cannot fail.
        let encoded = serde_json::to_string(result).unwrap_or_else(|_| result.to_string());
        self.push(format!("\nObservation: {encoded}"));
    }

    /// Record a failed tool call as `\nError: <message>`.
    pub fn push_rpc_error(&mut self, error: &RpcError) {
        self.push_error(&error.to_string());
    }

    /// Record any failure message as `\nError: <message>`.
    pub fn push_error(&mut self, message: &str) {
        self.push(format!("\nError: {message}"));
    }

    fn push(&mut self, entry: String) {
        self.text.push_str(&entry);
        self.entries += 1;
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of entries appended so far.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

impl std::fmt::Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
