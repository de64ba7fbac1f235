use sqlx::{Row, sqlite::SqliteRow};
use uuid::Uuid;

use crate::{
    db::error::{DbError, DbResult},
    models::{Message, MessageMetadata},
};

/// Parse a UUID string from the database, returning a DbError on failure
pub fn parse_uuid(s: &str) -> DbResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DbError::Internal(format!("Invalid UUID in database: {}", e)))
}

pub fn parse_optional_uuid(s: Option<String>) -> DbResult<Option<Uuid>> {
    s.as_deref().map(parse_uuid).transpose()
}

/// Columns selected for a message row, in the order [`message_from_row`] reads them.
pub const MESSAGE_COLUMNS: &str = "id, conversation_id, parent_message_id, thread_root_id, depth, \
     role, content, author_id, metadata, created_at";

pub fn message_from_row(row: &SqliteRow) -> DbResult<Message> {
    let role: String = row.get("role");
    let metadata: Option<String> = row.get("metadata");

    Ok(Message {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        conversation_id: parse_uuid(&row.get::<String, _>("conversation_id"))?,
        parent_message_id: parse_optional_uuid(row.get("parent_message_id"))?,
        thread_root_id: parse_uuid(&row.get::<String, _>("thread_root_id"))?,
        depth: row.get("depth"),
        role: role.parse().map_err(DbError::Internal)?,
        content: row.get("content"),
        author_id: row.get("author_id"),
        metadata: metadata
            .as_deref()
            .map(serde_json::from_str::<MessageMetadata>)
            .transpose()?,
        created_at: row.get("created_at"),
    })
}
