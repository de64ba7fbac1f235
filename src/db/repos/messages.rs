use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{Message, NewMessage},
};

#[async_trait]
pub trait MessageRepo: Send + Sync {
    /// Insert a placed message and bump the owning conversation's
    /// `updated_at` in the same transaction.
    ///
    /// Returns `DbError::NotFound` if the conversation no longer exists.
    async fn create(&self, input: NewMessage) -> DbResult<Message>;

    /// Get a message by ID
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Message>>;

    /// All messages in a conversation, by creation time then insertion order.
    async fn list_by_conversation(&self, conversation_id: Uuid) -> DbResult<Vec<Message>>;

    /// All messages sharing a thread root, in the same order as
    /// [`MessageRepo::list_by_conversation`].
    async fn list_by_thread_root(&self, thread_root_id: Uuid) -> DbResult<Vec<Message>>;
}
