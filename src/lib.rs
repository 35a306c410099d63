//! toolloop - a tool-using agent loop over JSON-RPC tool servers.
//!
//! This crate provides:
//! - A reason -> act -> observe loop driven by plain-text completions
//! - `ACTION: tool({...})` parsing and tool-name routing to logical servers
//! - A JSON-RPC 2.0 client over HTTP with per-call timeouts
//! - An OpenAI-compatible completions backend
//!
//! # Example
//!
//! ```ignore
//! use toolloop::{AgentLoop, Config, providers::OpenAiCompletions};
//!
//! let config = Config::load(None)?;
//! let backend = OpenAiCompletions::new(config.model.model.clone());
//! let agent = AgentLoop::from_config(&config, backend)?;
//!
//! let response = agent.run("What is 2+2?").await?;
//! println!("{}", response.text);
//! ```

#![forbid(unsafe_code)]

pub mod action;
mod agent_loop;
pub mod config;
mod context;
mod error;
mod events;
mod hooks;
pub mod llm;
pub mod providers;
pub mod reasoning;
pub mod router;
pub mod rpc;
mod types;

pub use action::{Action, parse_action};
pub use agent_loop::{AgentLoop, AgentLoopBuilder, builder};
pub use config::{AgentSettings, Config, MalformedActionPolicy, ModelSettings, ServerRegistry};
pub use context::Context;
pub use error::{AgentError, ConfigError, ReasoningError, RpcError};
pub use events::AgentEvent;
pub use hooks::{AgentHooks, DefaultHooks, LoggingHooks};
pub use llm::{CompletionBackend, CompletionParams};
pub use router::{ToolRouter, ToolTable};
pub use types::{AgentResponse, FinishReason, RunId};
