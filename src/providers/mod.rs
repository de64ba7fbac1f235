//! Upstream chat-completion backends.
//!
//! The completion orchestrator only needs "send these role/content pairs to
//! this model, give me the text back". Anything OpenAI-compatible (OpenAI,
//! Azure OpenAI behind a proxy, Ollama, vLLM, ...) is served by
//! [`open_ai::OpenAICompatibleProvider`].

use async_trait::async_trait;
use http::StatusCode;
use thiserror::Error;

use crate::models::ChatMessage;

pub(crate) mod open_ai;
pub mod test;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport failure: connect error, timeout, TLS.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The upstream answered with a non-success status.
    #[error("Upstream returned {status}")]
    Status {
        status: StatusCode,
        request_id: Option<String>,
        body: String,
    },

    #[error("Failed to decode upstream response: {0}")]
    Decode(String),

    #[error("Completion provider not configured")]
    NotConfigured,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Run a chat completion and return the first choice's text.
    async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ProviderError>;
}
