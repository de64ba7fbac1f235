use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::{
    auth::Principal,
    db::{DbError, DbPool},
    models::{
        Conversation, CreateMessageRequest, Message, MessageMetadata, MessageRole, NewMessage,
    },
    tree::{ContextMode, MessageArena, TreePlacement},
};

/// A message and everything below it.
#[derive(Debug, Clone, Serialize)]
pub struct Subtree {
    pub root: Message,
    /// Breadth-first from `root`. Only membership is guaranteed.
    pub descendants: Vec<Message>,
}

/// Message Tree Engine: placement on write, forest walks on read.
#[derive(Clone)]
pub struct MessageService {
    db: Arc<DbPool>,
}

impl MessageService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Create a message from an API request. The conversation must belong to
    /// the caller.
    pub async fn create(
        &self,
        principal: &Principal,
        request: CreateMessageRequest,
    ) -> ServiceResult<Message> {
        let (Some(conversation_id), Some(role), Some(content)) =
            (request.conversation_id, request.role, request.content)
        else {
            return Err(ServiceError::Validation(
                "conversation_id, role and content are required".into(),
            ));
        };

        match self.db.conversations().get_by_id(conversation_id).await? {
            Some(conversation) if principal.owns(&conversation.owner_id) => {}
            _ => return Err(ServiceError::NotFound),
        }

        let author_id = match role {
            MessageRole::User => Some(principal.id.clone()),
            MessageRole::Assistant => None,
        };

        self.append(
            conversation_id,
            request.parent_message_id,
            role,
            content,
            author_id,
            None,
        )
        .await
    }

    /// Place and persist a message. Parent, when given, must live in the
    /// same conversation.
    pub(crate) async fn append(
        &self,
        conversation_id: Uuid,
        parent_id: Option<Uuid>,
        role: MessageRole,
        content: String,
        author_id: Option<String>,
        metadata: Option<MessageMetadata>,
    ) -> ServiceResult<Message> {
        let id = Uuid::new_v4();
        let placement = match parent_id {
            None => TreePlacement::root(id),
            Some(parent_id) => match self.db.messages().get_by_id(parent_id).await? {
                Some(parent) if parent.conversation_id == conversation_id => {
                    TreePlacement::child_of(&parent)
                }
                _ => return Err(ServiceError::ParentNotFound),
            },
        };

        let input = NewMessage {
            id,
            conversation_id,
            parent_message_id: placement.parent_message_id,
            thread_root_id: placement.thread_root_id,
            depth: placement.depth,
            role,
            content,
            author_id,
            metadata,
        };

        let message = match self.db.messages().create(input).await {
            Ok(message) => message,
            Err(DbError::NotFound) => return Err(ServiceError::NotFound),
            // The parent vanished between lookup and insert.
            Err(DbError::Validation(_)) => return Err(ServiceError::ParentNotFound),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            message_id = %message.id,
            conversation_id = %conversation_id,
            depth = message.depth,
            "Created message"
        );
        Ok(message)
    }

    /// All messages of a conversation in creation order. Owner or admin.
    pub async fn list(
        &self,
        principal: &Principal,
        conversation_id: Uuid,
    ) -> ServiceResult<Vec<Message>> {
        self.readable_conversation(principal, conversation_id).await?;
        Ok(self
            .db
            .messages()
            .list_by_conversation(conversation_id)
            .await?)
    }

    /// The conversation's messages loaded into an arena. Owner or admin.
    pub async fn arena(
        &self,
        principal: &Principal,
        conversation_id: Uuid,
    ) -> ServiceResult<MessageArena> {
        self.list(principal, conversation_id)
            .await
            .map(MessageArena::new)
    }

    /// Resolve a message whose conversation the caller owns.
    ///
    /// Missing messages are `NotFound`; someone else's are `Forbidden`.
    pub async fn owned_message(
        &self,
        principal: &Principal,
        message_id: Uuid,
    ) -> ServiceResult<Message> {
        let message = self
            .db
            .messages()
            .get_by_id(message_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        match self
            .db
            .conversations()
            .get_by_id(message.conversation_id)
            .await?
        {
            Some(conversation) if principal.owns(&conversation.owner_id) => Ok(message),
            _ => Err(ServiceError::Forbidden),
        }
    }

    /// Context a completion on `message_id` would see. Empty if the message
    /// does not exist.
    pub async fn build_context(
        &self,
        message_id: Uuid,
        mode: ContextMode,
    ) -> ServiceResult<Vec<Message>> {
        let Some(target) = self.db.messages().get_by_id(message_id).await? else {
            return Ok(Vec::new());
        };

        let arena = MessageArena::new(
            self.db
                .messages()
                .list_by_conversation(target.conversation_id)
                .await?,
        );
        Ok(arena
            .context(message_id, mode)
            .into_iter()
            .cloned()
            .collect())
    }

    /// [`MessageService::build_context`] behind the owner check.
    pub async fn context(
        &self,
        principal: &Principal,
        message_id: Uuid,
        mode: ContextMode,
    ) -> ServiceResult<Vec<Message>> {
        self.owned_message(principal, message_id).await?;
        self.build_context(message_id, mode).await
    }

    /// The message and all of its descendants. Owner only.
    pub async fn subtree(&self, principal: &Principal, message_id: Uuid) -> ServiceResult<Subtree> {
        let target = self.owned_message(principal, message_id).await?;

        let thread: Vec<Message> = self
            .db
            .messages()
            .list_by_thread_root(target.thread_root_id)
            .await?
            .into_iter()
            .filter(|m| m.conversation_id == target.conversation_id)
            .collect();
        let arena = MessageArena::new(thread);

        let descendants = arena
            .descendants(message_id)
            .into_iter()
            .cloned()
            .collect();
        Ok(Subtree {
            root: target,
            descendants,
        })
    }

    async fn readable_conversation(
        &self,
        principal: &Principal,
        conversation_id: Uuid,
    ) -> ServiceResult<Conversation> {
        match self.db.conversations().get_by_id(conversation_id).await? {
            Some(conversation) if principal.can_read(&conversation.owner_id) => Ok(conversation),
            _ => Err(ServiceError::NotFound),
        }
    }
}
