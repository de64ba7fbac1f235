use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A conversation: a named container for a forest of message threads.
///
/// `owner_id` is the identity provider's subject and never changes after
/// creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub owner_id: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// The title, if it contains anything besides whitespace.
    pub fn non_blank_title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Input for creating a conversation
#[derive(Debug, Clone)]
pub struct CreateConversation {
    pub owner_id: String,
    pub title: Option<String>,
}

/// Request body for `POST /api/conversations`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateConversationRequest {
    #[validate(length(max = 200))]
    #[serde(default)]
    pub title: Option<String>,
}

impl CreateConversationRequest {
    /// Blank titles are stored as no title.
    pub fn into_create(self, owner_id: String) -> CreateConversation {
        CreateConversation {
            owner_id,
            title: self
                .title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        }
    }
}
