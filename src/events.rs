//! Agent events.
//!
//! The [`AgentEvent`] enum represents everything observable during a run.
//! Events are delivered synchronously to [`AgentHooks::on_event`](crate::AgentHooks::on_event).
//!
//! # Event Flow
//!
//! 1. `Start`
//! 2. `Completion`, then `ToolCallStart` / `ToolCallEnd` if the model acted,
//!    or `MalformedAction` if it tried and failed
//! 3. `Finish`

use crate::types::{FinishReason, RunId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A run has started
    Start { run_id: RunId, input: String },

    /// The model returned a completion
    Completion { step: usize, text: String },

    /// The completion carried the marker but could not be decoded
    MalformedAction { step: usize, reason: String },

    /// A tool call is about to be sent
    ToolCallStart {
        step: usize,
        tool: String,
        server: String,
        args: serde_json::Value,
    },

    /// A tool call returned or failed
    ToolCallEnd {
        step: usize,
        tool: String,
        server: String,
        duration_ms: u64,
        /// Error message, if the call failed
        error: Option<String>,
    },

    /// The run is over
    Finish {
        run_id: RunId,
        finish_reason: FinishReason,
        steps: usize,
        tool_calls: usize,
    },
}

impl AgentEvent {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Completion { .. } => "completion",
            Self::MalformedAction { .. } => "malformed_action",
            Self::ToolCallStart { .. } => "tool_call_start",
            Self::ToolCallEnd { .. } => "tool_call_end",
            Self::Finish { .. } => "finish",
        }
    }
}
