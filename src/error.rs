//! Error taxonomy for the agent loop.
//!
//! - [`RpcError`]: a single tool call failed. Recoverable at the loop level:
//!   the message is appended to the context and reasoning continues.
//! - [`ReasoningError`]: the model backend failed. Fatal for the run.
//! - [`AgentError`]: what [`AgentLoop::run`](crate::AgentLoop::run) returns.
//! - [`ConfigError`]: configuration could not be loaded or is inconsistent.

use thiserror::Error;

/// Failure of one JSON-RPC call to a tool server.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The server key has no endpoint in the registry. Raised before any I/O.
    #[error("unknown server: {server}")]
    Configuration { server: String },

    /// The request never produced an HTTP response (refused, timeout, DNS).
    #[error("transport error calling {server}: {source}")]
    Transport {
        server: String,
        #[source]
        source: anyhow::Error,
    },

    /// The server answered, but not with a usable result.
    #[error("remote error from {server} (status {status}): {body}")]
    Remote {
        server: String,
        status: u16,
        body: String,
    },
}

impl RpcError {
    /// Logical server key the failed call was addressed to.
    #[must_use]
    pub fn server(&self) -> &str {
        match self {
            Self::Configuration { server }
            | Self::Transport { server, .. }
            | Self::Remote { server, .. } => server,
        }
    }
}

/// The model backend could not produce a completion.
#[derive(Debug, Error)]
#[error("reasoning failed: {source}")]
pub struct ReasoningError {
    #[from]
    source: anyhow::Error,
}

impl ReasoningError {
    #[must_use]
    pub fn new(source: anyhow::Error) -> Self {
        Self { source }
    }
}

/// Fatal outcome of an agent run.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Reasoning(#[from] ReasoningError),

    #[error("agent run cancelled")]
    Cancelled,
}

/// Configuration could not be loaded or validated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid endpoint for server {server}: {reason}")]
    InvalidEndpoint { server: String, reason: String },

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}
