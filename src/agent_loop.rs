use crate::action::{Action, parse_action};
use crate::config::{AgentSettings, Config, MalformedActionPolicy, ServerRegistry};
use crate::context::Context;
use crate::error::{AgentError, RpcError};
use crate::events::AgentEvent;
use crate::hooks::{AgentHooks, DefaultHooks};
use crate::llm::{CompletionBackend, CompletionParams};
use crate::reasoning::{Reasoner, default_instruction};
use crate::router::ToolRouter;
use crate::rpc::{HttpTransport, RpcClient, RpcTransport};
use crate::types::{AgentResponse, FinishReason, RunId};
use anyhow::Result;
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

#[cfg(test)]
mod test_utils;

/// Builder for constructing an `AgentLoop`.
///
/// The backend is the only required component. Everything else defaults:
/// the built-in tool table and server registry, an HTTP transport with the
/// configured timeout, [`DefaultHooks`], and [`AgentSettings::default`].
///
/// # Example
///
/// ```ignore
/// let agent = AgentLoop::builder()
///     .backend(OpenAiCompletions::new("smollm2".to_string()))
///     .settings(AgentSettings { max_steps: 5, ..Default::default() })
///     .build()?;
///
/// let response = agent.run("What is 2+2?").await?;
/// ```
pub struct AgentLoopBuilder<B, H> {
    backend: B,
    hooks: H,
    router: Option<ToolRouter>,
    registry: Option<Arc<ServerRegistry>>,
    transport: Option<Arc<dyn RpcTransport>>,
    settings: Option<AgentSettings>,
    instruction: Option<String>,
}

impl AgentLoopBuilder<(), DefaultHooks> {
    /// Create a new builder with no backend set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            backend: (),
            hooks: DefaultHooks,
            router: None,
            registry: None,
            transport: None,
            settings: None,
            instruction: None,
        }
    }
}

impl Default for AgentLoopBuilder<(), DefaultHooks> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B, H> AgentLoopBuilder<B, H> {
    /// Set the completion backend.
    #[must_use]
    pub fn backend<B2: CompletionBackend>(self, backend: B2) -> AgentLoopBuilder<B2, H> {
        AgentLoopBuilder {
            backend,
            hooks: self.hooks,
            router: self.router,
            registry: self.registry,
            transport: self.transport,
            settings: self.settings,
            instruction: self.instruction,
        }
    }

    /// Set the agent hooks.
    #[must_use]
    pub fn hooks<H2: AgentHooks>(self, hooks: H2) -> AgentLoopBuilder<B, H2> {
        AgentLoopBuilder {
            backend: self.backend,
            hooks,
            router: self.router,
            registry: self.registry,
            transport: self.transport,
            settings: self.settings,
            instruction: self.instruction,
        }
    }

    /// Set the tool router.
    #[must_use]
    pub fn router(mut self, router: ToolRouter) -> Self {
        self.router = Some(router);
        self
    }

    /// Set the server registry.
    #[must_use]
    pub fn registry(mut self, registry: ServerRegistry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Set the RPC transport. Defaults to [`HttpTransport`].
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn RpcTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set loop bounds and sampling parameters.
    #[must_use]
    pub fn settings(mut self, settings: AgentSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Override the system instruction.
    ///
    /// Takes precedence over [`AgentSettings::system_prompt`].
    #[must_use]
    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }
}

impl<B, H> AgentLoopBuilder<B, H>
where
    B: CompletionBackend,
    H: AgentHooks,
{
    /// Build the agent loop.
    ///
    /// # Errors
    ///
    /// Returns an error if no transport was set and the default HTTP
    /// transport cannot be created.
    pub fn build(self) -> Result<AgentLoop<B, H>> {
        let settings = self.settings.unwrap_or_default();
        let router = self.router.unwrap_or_default();
        let registry = self.registry.unwrap_or_default();
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(settings.rpc_timeout())?),
        };

        let instruction = self
            .instruction
            .or_else(|| settings.system_prompt.clone())
            .unwrap_or_else(|| default_instruction(&router));

        let params = CompletionParams {
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        };

        Ok(AgentLoop {
            reasoner: Reasoner::new(self.backend, instruction, params),
            router: Arc::new(router),
            client: RpcClient::new(registry, transport),
            hooks: self.hooks,
            settings,
        })
    }
}

/// Create a new builder for constructing an `AgentLoop`.
#[must_use]
pub const fn builder() -> AgentLoopBuilder<(), DefaultHooks> {
    AgentLoopBuilder::new()
}

/// The reason -> act -> observe loop.
///
/// One `AgentLoop` can answer many queries; each call to [`run`](Self::run)
/// starts from an empty context and shares nothing with other runs except
/// the read-only router and registry.
pub struct AgentLoop<B, H = DefaultHooks> {
    reasoner: Reasoner<B>,
    router: Arc<ToolRouter>,
    client: RpcClient,
    hooks: H,
    settings: AgentSettings,
}

impl AgentLoop<(), DefaultHooks> {
    /// Create a new builder for constructing an `AgentLoop`.
    #[must_use]
    pub const fn builder() -> AgentLoopBuilder<(), DefaultHooks> {
        AgentLoopBuilder::new()
    }
}

impl<B: CompletionBackend> AgentLoop<B, DefaultHooks> {
    /// Build a loop from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP
    /// transport cannot be created.
    pub fn from_config(config: &Config, backend: B) -> Result<Self> {
        let registry = config.validate()?;
        AgentLoopBuilder::new()
            .backend(backend)
            .router(ToolRouter::new(config.router.clone()))
            .registry(registry)
            .settings(config.agent.clone())
            .build()
    }
}

impl<B, H> AgentLoop<B, H>
where
    B: CompletionBackend,
    H: AgentHooks,
{
    #[must_use]
    pub const fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    #[must_use]
    pub fn router(&self) -> &ToolRouter {
        &self.router
    }

    #[must_use]
    pub fn instruction(&self) -> &str {
        self.reasoner.instruction()
    }

    /// Answer one user query.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Reasoning`] if the model backend fails. Tool
    /// failures never end the run; they are fed back to the model.
    pub async fn run(&self, input: &str) -> Result<AgentResponse, AgentError> {
        self.run_with_cancel(input, &CancellationToken::new()).await
    }

    /// Answer one user query, aborting when `cancel` fires.
    ///
    /// Cancellation is checked while waiting on the model or a tool server.
    /// A step interrupted that way adds nothing to the context.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Cancelled`] on cancellation and
    /// [`AgentError::Reasoning`] if the model backend fails.
    pub async fn run_with_cancel(
        &self,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<AgentResponse, AgentError> {
        let run_id = RunId::new();
        let max_steps = self.settings.max_steps.max(1);
        let mut context = Context::new();
        let mut tool_calls = 0;
        let mut last_completion = String::new();

        info!("run {run_id} started max_steps={max_steps}");
        self.hooks
            .on_event(&AgentEvent::Start {
                run_id: run_id.clone(),
                input: input.to_string(),
            })
            .await;

        for step in 1..=max_steps {
            let completion = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(cancelled(&run_id, step)),
                result = self.reasoner.step(context.as_str(), input) => result?,
            };

            self.hooks
                .on_event(&AgentEvent::Completion {
                    step,
                    text: completion.clone(),
                })
                .await;

            match parse_action(&completion) {
                Action::NoAction => {
                    return Ok(self
                        .finish(run_id, completion, FinishReason::Answered, step, tool_calls)
                        .await);
                }
                Action::Malformed { reason, .. } => {
                    debug!("run {run_id} step {step}: malformed action: {reason}");
                    self.hooks
                        .on_event(&AgentEvent::MalformedAction {
                            step,
                            reason: reason.clone(),
                        })
                        .await;

                    match self.settings.malformed_action {
                        MalformedActionPolicy::Respond => {
                            return Ok(self
                                .finish(run_id, completion, FinishReason::Answered, step, tool_calls)
                                .await);
                        }
                        MalformedActionPolicy::Retry => {
                            context.push_error(&format!("malformed action: {reason}"));
                        }
                    }
                }
                Action::ToolCall { name, args } => {
                    tool_calls += 1;
                    let Some(observation) = self.act(step, &name, args, cancel).await else {
                        return Err(cancelled(&run_id, step));
                    };
                    match observation {
                        Ok(result) => context.push_observation(&result),
                        Err(error) => context.push_rpc_error(&error),
                    }
                }
            }

            last_completion = completion;
        }

        warn!("run {run_id} hit the step limit ({max_steps}) without a final answer");
        Ok(self
            .finish(
                run_id,
                last_completion,
                FinishReason::StepLimit,
                max_steps,
                tool_calls,
            )
            .await)
    }

    /// Route and execute one tool call. `None` means cancelled.
    async fn act(
        &self,
        step: usize,
        tool: &str,
        args: Map<String, Value>,
        cancel: &CancellationToken,
    ) -> Option<Result<Value, RpcError>> {
        let server = self.router.route(tool).to_string();
        debug!("step {step}: calling {tool} on {server}");

        self.hooks
            .on_event(&AgentEvent::ToolCallStart {
                step,
                tool: tool.to_string(),
                server: server.clone(),
                args: Value::Object(args.clone()),
            })
            .await;

        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return None,
            outcome = self.client.call(&server, tool, args) => outcome,
        };
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if let Err(error) = &outcome {
            self.hooks.on_tool_error(tool, error).await;
        }

        self.hooks
            .on_event(&AgentEvent::ToolCallEnd {
                step,
                tool: tool.to_string(),
                server,
                duration_ms,
                error: outcome.as_ref().err().map(ToString::to_string),
            })
            .await;

        Some(outcome)
    }

    async fn finish(
        &self,
        run_id: RunId,
        text: String,
        finish_reason: FinishReason,
        steps: usize,
        tool_calls: usize,
    ) -> AgentResponse {
        info!("run {run_id} finished reason={finish_reason:?} steps={steps} tool_calls={tool_calls}");
        self.hooks
            .on_event(&AgentEvent::Finish {
                run_id,
                finish_reason,
                steps,
                tool_calls,
            })
            .await;

        AgentResponse {
            text,
            finish_reason,
            steps,
            tool_calls,
        }
    }
}

fn cancelled(run_id: &RunId, step: usize) -> AgentError {
    info!("run {run_id} cancelled at step {step}");
    AgentError::Cancelled
}
