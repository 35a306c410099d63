//! Completion backend implementations.
//!
//! This module contains implementations of the `CompletionBackend` trait.

pub mod openai;

pub use openai::OpenAiCompletions;
