//! Text-completion backend interface.
//!
//! The agent only needs one capability from a model: given a prompt and
//! sampling parameters, return a completion string. Concrete backends live in
//! [`crate::providers`].

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Generation parameters for one completion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompletionParams {
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.7,
        }
    }
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Produce one completion for `prompt`.
    async fn complete(&self, prompt: &str, params: CompletionParams) -> Result<String>;

    /// Model identifier, for logs.
    fn model(&self) -> &str;
}

#[async_trait]
impl<T: CompletionBackend + ?Sized> CompletionBackend for Arc<T> {
    async fn complete(&self, prompt: &str, params: CompletionParams) -> Result<String> {
        (**self).complete(prompt, params).await
    }

    fn model(&self) -> &str {
        (**self).model()
    }
}
