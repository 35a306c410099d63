use crate::error::RpcError;
use crate::events::AgentEvent;
use crate::hooks::AgentHooks;
use crate::llm::{CompletionBackend, CompletionParams};
use crate::rpc::{JsonRpcRequest, RawResponse, RpcTransport};
use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

// ===================
// Mock Completion Backend
// ===================

/// Replays scripted completions, then answers "Done.".
pub struct MockBackend {
    completions: Vec<String>,
    failing: bool,
    call_count: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new(completions: &[&str]) -> Self {
        Self {
            completions: completions.iter().map(ToString::to_string).collect(),
            failing: false,
            call_count: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A backend whose every call fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new(&[])
        }
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn complete(&self, prompt: &str, _params: CompletionParams) -> Result<String> {
        let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .expect("lock poisoned")
            .push(prompt.to_string());

        if self.failing {
            bail!("backend unavailable");
        }
        Ok(self
            .completions
            .get(idx)
            .cloned()
            .unwrap_or_else(|| "Done.".to_string()))
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

// ===================
// Mock RPC Transport
// ===================

enum Reply {
    Body(u16, String),
    Refused,
}

/// Answers every request the same way and records what was sent.
pub struct MockTransport {
    reply: Reply,
    call_count: AtomicUsize,
    requests: Mutex<Vec<(Url, JsonRpcRequest)>>,
}

impl MockTransport {
    /// Reply with a JSON-RPC success carrying `result`.
    pub fn result(result: serde_json::Value) -> Arc<Self> {
        let body = serde_json::json!({"jsonrpc": "2.0", "result": result, "id": 1});
        Self::with_reply(Reply::Body(200, body.to_string()))
    }

    /// Reply with an arbitrary status and body.
    pub fn status(status: u16, body: &str) -> Arc<Self> {
        Self::with_reply(Reply::Body(status, body.to_string()))
    }

    /// Fail every request before a response arrives.
    pub fn refused() -> Arc<Self> {
        Self::with_reply(Reply::Refused)
    }

    fn with_reply(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            call_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(Url, JsonRpcRequest)> {
        self.requests.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn send(&self, endpoint: &Url, request: &JsonRpcRequest) -> Result<RawResponse> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .expect("lock poisoned")
            .push((endpoint.clone(), request.clone()));

        match &self.reply {
            Reply::Body(status, body) => Ok(RawResponse::new(*status, body.clone())),
            Reply::Refused => bail!("connection refused"),
        }
    }
}

// ===================
// Recording Hooks
// ===================

#[derive(Default)]
pub struct RecordingHooks {
    events: Mutex<Vec<AgentEvent>>,
    tool_errors: Mutex<Vec<(String, String)>>,
}

impl RecordingHooks {
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .expect("lock poisoned")
            .iter()
            .map(AgentEvent::kind)
            .collect()
    }

    pub fn events(&self) -> Vec<AgentEvent> {
        self.events.lock().expect("lock poisoned").clone()
    }

    pub fn tool_errors(&self) -> Vec<(String, String)> {
        self.tool_errors.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl AgentHooks for RecordingHooks {
    async fn on_event(&self, event: &AgentEvent) {
        self.events
            .lock()
            .expect("lock poisoned")
            .push(event.clone());
    }

    async fn on_tool_error(&self, tool: &str, error: &RpcError) {
        self.tool_errors
            .lock()
            .expect("lock poisoned")
            .push((tool.to_string(), error.server().to_string()));
    }
}
