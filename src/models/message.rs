use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            _ => Err(format!("Invalid message role: {}", s)),
        }
    }
}

/// A message node in a conversation's thread forest.
///
/// A message with no parent is a thread root: `thread_root_id == id` and
/// `depth == 0`. Otherwise `thread_root_id` is inherited from the parent and
/// `depth` is one more than the parent's. Messages are immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub parent_message_id: Option<Uuid>,
    pub thread_root_id: Uuid,
    pub depth: i32,
    pub role: MessageRole,
    pub content: String,
    /// `None` for assistant messages.
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn is_thread_root(&self) -> bool {
        self.parent_message_id.is_none()
    }
}

/// Side-channel data attached when a message is created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_warning: Option<CompletionWarning>,
}

/// Diagnostic recorded when the completion call failed and a placeholder
/// reply was stored instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionWarning {
    /// Upstream HTTP status, absent for transport failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub details: String,
}

/// A fully placed message ready to be persisted.
///
/// Tree fields are computed by [`crate::tree::TreePlacement`] before the
/// repository sees the row.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub parent_message_id: Option<Uuid>,
    pub thread_root_id: Uuid,
    pub depth: i32,
    pub role: MessageRole,
    pub content: String,
    pub author_id: Option<String>,
    pub metadata: Option<MessageMetadata>,
}

/// Request body for `POST /api/messages`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMessageRequest {
    #[validate(required)]
    pub conversation_id: Option<Uuid>,
    #[serde(default)]
    pub parent_message_id: Option<Uuid>,
    #[validate(required)]
    pub role: Option<MessageRole>,
    #[validate(required, length(min = 1))]
    pub content: Option<String>,
}

/// A `{role, content}` pair as sent to the completion API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        }
    }
}

/// A context entry returned by `GET /api/messages/{id}/context`.
#[derive(Debug, Clone, Serialize)]
pub struct ContextEntry {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Message> for ContextEntry {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            role: message.role,
            content: message.content.clone(),
            created_at: message.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_serializes_without_empty_fields() {
        let metadata = MessageMetadata {
            completion_warning: Some(CompletionWarning {
                status: None,
                details: "connection refused".into(),
            }),
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"completion_warning": {"details": "connection refused"}})
        );
    }

    #[test]
    fn test_create_request_requires_fields() {
        let req: CreateMessageRequest =
            serde_json::from_str(r#"{"role":"user","content":"hi"}"#).unwrap();
        assert!(req.validate().is_err());

        let req: CreateMessageRequest = serde_json::from_str(&format!(
            r#"{{"conversation_id":"{}","role":"user","content":""}}"#,
            Uuid::new_v4()
        ))
        .unwrap();
        assert!(req.validate().is_err());

        let req: CreateMessageRequest = serde_json::from_str(&format!(
            r#"{{"conversation_id":"{}","role":"user","content":"hi"}}"#,
            Uuid::new_v4()
        ))
        .unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let result: Result<CreateMessageRequest, _> =
            serde_json::from_str(r#"{"role":"system","content":"hi"}"#);
        assert!(result.is_err());
    }
}
