//! One reasoning step: build the prompt, ask the model once.

use std::fmt::Write;

use crate::action::ACTION_MARKER;
use crate::error::ReasoningError;
use crate::llm::{CompletionBackend, CompletionParams};
use crate::router::ToolRouter;

/// Prompt layout, in order: instruction, context, user input, agent cue.
///
/// ```text
/// {instruction}
/// Context: {context}
/// User: {input}
/// Agent:
/// ```
#[must_use]
pub fn build_prompt(instruction: &str, context: &str, input: &str) -> String {
    format!("{instruction}\nContext: {context}\nUser: {input}\nAgent:")
}

/// Default system instruction, listing the tools the router knows about.
#[must_use]
pub fn default_instruction(router: &ToolRouter) -> String {
    let mut prompt = format!(
        "You are a helpful AI agent. Respond directly to simple queries. \
         For complex tasks requiring tools, output in the format:\n\
         {ACTION_MARKER} tool_name({{\"arg1\": \"value1\", \"arg2\": \"value2\"}})\n\
         Available tools:"
    );

    let tools = router.tool_names();
    for (server, names) in &tools {
        if names.is_empty() {
            continue;
        }
        let _ = write!(prompt, " {} ({server});", names.join(", "));
    }
    let _ = write!(
        prompt,
        " other task tools ({}).",
        router.default_server()
    );
    prompt
}

/// Turns instruction + context + input into one completion.
pub struct Reasoner<B> {
    backend: B,
    instruction: String,
    params: CompletionParams,
}

impl<B: CompletionBackend> Reasoner<B> {
    #[must_use]
    pub const fn new(backend: B, instruction: String, params: CompletionParams) -> Self {
        Self {
            backend,
            instruction,
            params,
        }
    }

    #[must_use]
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Request one completion. The raw text is returned untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ReasoningError`] when the backend fails.
    pub async fn step(&self, context: &str, input: &str) -> Result<String, ReasoningError> {
        let prompt = build_prompt(&self.instruction, context, input);
        log::debug!(
            "reasoning step model={} prompt_len={}",
            self.backend.model(),
            prompt.len()
        );
        self.backend
            .complete(&prompt, self.params)
            .await
            .map_err(ReasoningError::new)
    }
}
