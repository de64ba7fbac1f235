//! Scripted provider for exercising the orchestrator without a network.

use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use http::StatusCode;

use crate::{
    models::ChatMessage,
    providers::{CompletionProvider, ProviderError},
};

/// What the next call should produce.
#[derive(Debug, Clone)]
pub enum TestReply {
    Text(String),
    Status {
        status: u16,
        request_id: Option<String>,
        body: String,
    },
    Decode(String),
}

/// Replays a fixed reply and counts calls. Records the last request so
/// tests can inspect the assembled context.
pub struct TestProvider {
    reply: TestReply,
    calls: AtomicUsize,
    last_request: Mutex<Option<(String, Vec<ChatMessage>)>>,
}

impl TestProvider {
    pub fn new(reply: TestReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(TestReply::Text(text.into()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<(String, Vec<ChatMessage>)> {
        self.last_request
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl CompletionProvider for TestProvider {
    async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some((model.to_string(), messages.to_vec()));
        }

        match &self.reply {
            TestReply::Text(text) => Ok(text.clone()),
            TestReply::Status {
                status,
                request_id,
                body,
            } => Err(ProviderError::Status {
                status: StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                request_id: request_id.clone(),
                body: body.clone(),
            }),
            TestReply::Decode(message) => Err(ProviderError::Decode(message.clone())),
        }
    }
}
