//! Ollama HTTP client: chat completions and embeddings.

pub mod client;
mod reply;
pub mod types;

pub use client::{OllamaClient, OllamaError};

/// A prompt-in, text-out language model.
/// Implemented by `OllamaClient`; the LLM-backed grader, generator and
/// rewriter are written against this trait so tests can script replies.
pub trait TextModel {
    async fn complete(&self, prompt: &str) -> Result<String, OllamaError>;
}
