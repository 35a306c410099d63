//! Core types for the agent loop.
//!
//! - [`RunId`]: Identifier of one query's run, used to correlate logs
//! - [`FinishReason`]: Why a run stopped
//! - [`AgentResponse`]: What a run returns

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one agent run
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why the loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model produced a non-action completion.
    Answered,
    /// The step bound was reached; the text is the last completion.
    StepLimit,
}

/// Final result of one query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Answer text. Never includes the accumulated context.
    pub text: String,
    pub finish_reason: FinishReason,
    /// Reasoning calls made.
    pub steps: usize,
    /// Tool calls attempted, failed ones included.
    pub tool_calls: usize,
}

impl AgentResponse {
    #[must_use]
    pub const fn hit_step_limit(&self) -> bool {
        matches!(self.finish_reason, FinishReason::StepLimit)
    }
}
