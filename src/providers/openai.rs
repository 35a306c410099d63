//! OpenAI-compatible text completion backend.
//!
//! Talks to the legacy `/completions` endpoint, which llama.cpp server,
//! vLLM, Ollama and most local inference servers expose. The prompt is sent
//! as-is; no chat template is applied on this side.

use crate::llm::{CompletionBackend, CompletionParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:8080/v1";

/// Completion backend for OpenAI-compatible servers.
#[derive(Clone)]
pub struct OpenAiCompletions {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OpenAiCompletions {
    /// Create a backend for `model` on a local server at the default URL.
    #[must_use]
    pub fn new(model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: None,
            model,
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }

    /// Create a backend with a custom base URL and request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_base_url(model: String, base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: None,
            model,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Send `Authorization: Bearer <key>` with every request.
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompletions {
    async fn complete(&self, prompt: &str, params: CompletionParams) -> Result<String> {
        let api_request = ApiCompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: false,
        };

        tracing::debug!(
            model = %self.model,
            max_tokens = params.max_tokens,
            temperature = params.temperature,
            prompt_len = prompt.len(),
            "completion request"
        );

        let mut request = self
            .client
            .post(format!("{}/completions", self.base_url))
            .json(&api_request);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("request failed: {e}"))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| anyhow::anyhow!("failed to read response body: {e}"))?;

        tracing::debug!(
            status = %status,
            body_len = bytes.len(),
            "completion response"
        );

        if status == StatusCode::TOO_MANY_REQUESTS {
            anyhow::bail!("rate limited by completion backend");
        }

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            tracing::warn!(status = %status, body = %body, "completion backend error");
            anyhow::bail!("completion backend returned {status}: {body}");
        }

        let api_response: ApiCompletionResponse = serde_json::from_slice(&bytes)
            .map_err(|e| anyhow::anyhow!("failed to parse response: {e}"))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("no choices in response"))?;

        if let Some(usage) = api_response.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
                "completion usage"
            );
        }

        Ok(choice.text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Serialize)]
struct ApiCompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ApiCompletionResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    text: String,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}
