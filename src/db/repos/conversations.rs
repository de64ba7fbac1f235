use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{Conversation, CreateConversation},
};

#[async_trait]
pub trait ConversationRepo: Send + Sync {
    /// Create a new conversation
    async fn create(&self, input: CreateConversation) -> DbResult<Conversation>;

    /// Get a conversation by ID
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Conversation>>;

    /// List an owner's conversations, most recently updated first.
    ///
    /// Ties on `updated_at` are broken by `id` descending.
    async fn list_by_owner(&self, owner_id: &str) -> DbResult<Vec<Conversation>>;

    /// Set the title. Returns `DbError::NotFound` if the conversation is gone.
    async fn set_title(&self, id: Uuid, title: &str) -> DbResult<Conversation>;

    /// Delete a conversation and all of its messages.
    ///
    /// Returns `DbError::NotFound` if the conversation does not exist.
    async fn delete(&self, id: Uuid) -> DbResult<()>;
}
