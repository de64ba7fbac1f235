use std::sync::Arc;

use uuid::Uuid;

use super::{MessageService, ServiceError, ServiceResult};
use crate::{
    auth::Principal,
    config::CompletionConfig,
    models::{ChatMessage, CompletionWarning, Message, MessageMetadata, MessageRole},
    providers::{CompletionProvider, ProviderError},
    tree::ContextMode,
};

/// Stored when no completion provider is configured.
pub const PLACEHOLDER_REPLY: &str = "(placeholder reply)";
/// Stored when the upstream answered with a non-success status.
pub const UPSTREAM_ERROR_REPLY: &str =
    "(placeholder reply: the completion service returned an error)";
/// Stored when the upstream could not be reached or its answer not read.
pub const UPSTREAM_UNREACHABLE_REPLY: &str =
    "(placeholder reply: the completion service could not be reached)";
/// Stored when the upstream answered with blank content.
pub const EMPTY_REPLY: &str = "(empty reply)";

/// Characters of an upstream error body written to the log.
const LOGGED_BODY_CHARS: usize = 2000;

/// Completion Orchestrator.
///
/// Upstream failures never fail the request: they become a placeholder reply
/// with a `completion_warning` in its metadata.
#[derive(Clone)]
pub struct CompletionService {
    messages: MessageService,
    provider: Option<Arc<dyn CompletionProvider>>,
    model: String,
    system_prompt: Option<String>,
    error_body_limit: usize,
}

/// What to store as the assistant reply.
struct Reply {
    content: String,
    warning: Option<CompletionWarning>,
}

impl Reply {
    fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            warning: None,
        }
    }
}

impl CompletionService {
    pub fn new(
        messages: MessageService,
        provider: Option<Arc<dyn CompletionProvider>>,
        config: &CompletionConfig,
    ) -> Self {
        Self {
            messages,
            provider,
            model: config.model.clone(),
            system_prompt: config
                .system_prompt
                .clone()
                .filter(|p| !p.trim().is_empty()),
            error_body_limit: config.error_body_limit,
        }
    }

    /// Generate and store an assistant reply to `message_id`.
    #[tracing::instrument(skip(self, principal), fields(owner_id = %principal.id))]
    pub async fn complete(
        &self,
        principal: &Principal,
        message_id: Uuid,
        mode: ContextMode,
    ) -> ServiceResult<Message> {
        let target = self.messages.owned_message(principal, message_id).await?;

        let reply = match &self.provider {
            None => Reply::text(PLACEHOLDER_REPLY),
            Some(provider) => {
                let context = self.messages.build_context(message_id, mode).await?;
                if context.is_empty() {
                    // Target deleted since it was resolved.
                    return Err(ServiceError::NotFound);
                }
                self.ask(provider.as_ref(), &context).await
            }
        };

        let metadata = reply.warning.map(|warning| MessageMetadata {
            completion_warning: Some(warning),
        });

        match self
            .messages
            .append(
                target.conversation_id,
                Some(target.id),
                MessageRole::Assistant,
                reply.content,
                None,
                metadata,
            )
            .await
        {
            Ok(message) => Ok(message),
            Err(ServiceError::ParentNotFound) => Err(ServiceError::NotFound),
            Err(e) => Err(e),
        }
    }

    async fn ask(&self, provider: &dyn CompletionProvider, context: &[Message]) -> Reply {
        let mut messages = Vec::with_capacity(context.len() + 1);
        if let Some(prompt) = &self.system_prompt {
            messages.push(ChatMessage::system(prompt.clone()));
        }
        messages.extend(context.iter().map(ChatMessage::from));

        match provider.chat(&self.model, &messages).await {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    Reply::text(EMPTY_REPLY)
                } else {
                    Reply::text(text)
                }
            }
            Err(ProviderError::Status {
                status,
                request_id,
                body,
            }) => {
                tracing::error!(
                    status = status.as_u16(),
                    request_id = request_id.as_deref().unwrap_or("n/a"),
                    body = %truncate_chars(&body, LOGGED_BODY_CHARS),
                    "Completion API returned an error"
                );
                Reply {
                    content: UPSTREAM_ERROR_REPLY.to_string(),
                    warning: Some(CompletionWarning {
                        status: Some(status.as_u16()),
                        details: format!(
                            "request_id={} body={}",
                            request_id.as_deref().unwrap_or("n/a"),
                            truncate_chars(&body, self.error_body_limit)
                        ),
                    }),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Completion API call failed");
                Reply {
                    content: UPSTREAM_UNREACHABLE_REPLY.to_string(),
                    warning: Some(CompletionWarning {
                        status: None,
                        details: e.to_string(),
                    }),
                }
            }
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
