//! Agent lifecycle hooks.
//!
//! Hooks let callers observe the loop without changing it:
//!
//! - [`AgentHooks::on_event`] - Called for every [`AgentEvent`]
//! - [`AgentHooks::on_tool_error`] - Called when a tool call fails
//!
//! # Built-in Implementations
//!
//! - [`DefaultHooks`] - Does nothing
//! - [`LoggingHooks`] - Debug logging for all events

use crate::error::RpcError;
use crate::events::AgentEvent;
use async_trait::async_trait;

/// Lifecycle hooks for the agent loop.
/// All methods have no-op defaults.
#[async_trait]
pub trait AgentHooks: Send + Sync {
    /// Called when the agent emits an event.
    async fn on_event(&self, _event: &AgentEvent) {}

    /// Called when a tool call fails, before the error is added to the
    /// context.
    async fn on_tool_error(&self, _tool: &str, _error: &RpcError) {}
}

#[async_trait]
impl<T: AgentHooks + ?Sized> AgentHooks for std::sync::Arc<T> {
    async fn on_event(&self, event: &AgentEvent) {
        (**self).on_event(event).await;
    }

    async fn on_tool_error(&self, tool: &str, error: &RpcError) {
        (**self).on_tool_error(tool, error).await;
    }
}

/// Hooks that do nothing
pub struct DefaultHooks;

#[async_trait]
impl AgentHooks for DefaultHooks {}

/// Hooks that log all events (useful for debugging)
pub struct LoggingHooks;

#[async_trait]
impl AgentHooks for LoggingHooks {
    async fn on_event(&self, event: &AgentEvent) {
        match event {
            AgentEvent::ToolCallStart {
                tool, server, args, ..
            } => tracing::debug!(
                tool = tool.as_str(),
                server = server.as_str(),
                %args,
                "Tool call start"
            ),
            AgentEvent::ToolCallEnd {
                tool,
                server,
                duration_ms,
                error,
                ..
            } => tracing::debug!(
                tool = tool.as_str(),
                server = server.as_str(),
                duration_ms = *duration_ms,
                error = error.as_deref().unwrap_or(""),
                "Tool call end"
            ),
            other => tracing::debug!(event = ?other, "Agent event"),
        }
    }

    async fn on_tool_error(&self, tool: &str, error: &RpcError) {
        tracing::warn!(tool, server = error.server(), %error, "Tool call failed");
    }
}
