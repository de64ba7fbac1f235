//! Business logic between the HTTP handlers and the repositories.
//!
//! Every operation takes the resolved [`Principal`](crate::auth::Principal)
//! as an explicit argument; nothing here reads request state ambiently.

mod completions;
mod conversations;
mod messages;
mod timeline;

use std::sync::Arc;

pub use completions::{
    CompletionService, EMPTY_REPLY, PLACEHOLDER_REPLY, UPSTREAM_ERROR_REPLY,
    UPSTREAM_UNREACHABLE_REPLY,
};
pub use conversations::{ConversationService, fallback_title};
pub use messages::{MessageService, Subtree};
pub use timeline::{PendingAssistant, ThreadPanel, Timeline, TimelineEntry};

use crate::{
    config::CompletionConfig,
    db::{DbError, DbPool},
    providers::CompletionProvider,
};

/// Domain failures surfaced to handlers.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Missing, or hidden from the caller.
    #[error("Not found")]
    NotFound,

    /// The caller may not act on a resource it can see exists.
    #[error("Forbidden")]
    Forbidden,

    /// Parent message absent or in another conversation.
    #[error("Parent message not found")]
    ParentNotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub conversations: ConversationService,
    pub messages: MessageService,
    pub completions: CompletionService,
}

impl Services {
    /// `provider` is `None` when no completion API key is configured.
    pub fn new(
        db: Arc<DbPool>,
        provider: Option<Arc<dyn CompletionProvider>>,
        config: &CompletionConfig,
    ) -> Self {
        let messages = MessageService::new(db.clone());
        Self {
            conversations: ConversationService::new(db.clone(), provider.clone(), config),
            completions: CompletionService::new(messages.clone(), provider, config),
            messages,
        }
    }
}
