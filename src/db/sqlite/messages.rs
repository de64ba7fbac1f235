use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::common::{MESSAGE_COLUMNS, message_from_row};
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::MessageRepo,
        timestamp_now,
    },
    models::{Message, NewMessage},
};

pub struct SqliteMessageRepo {
    pool: SqlitePool,
}

impl SqliteMessageRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepo for SqliteMessageRepo {
    async fn create(&self, input: NewMessage) -> DbResult<Message> {
        let now = timestamp_now();
        let metadata_json = input
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(input.conversation_id.to_string())
            .execute(&mut *tx)
            .await?;

        if touched.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        sqlx::query(
            r#"
            INSERT INTO messages (
                id, conversation_id, parent_message_id, thread_root_id, depth,
                role, content, author_id, metadata, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(input.id.to_string())
        .bind(input.conversation_id.to_string())
        .bind(input.parent_message_id.map(|id| id.to_string()))
        .bind(input.thread_root_id.to_string())
        .bind(input.depth)
        .bind(input.role.as_str())
        .bind(&input.content)
        .bind(&input.author_id)
        .bind(&metadata_json)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from_constraint(e, "Message"))?;

        tx.commit().await?;

        Ok(Message {
            id: input.id,
            conversation_id: input.conversation_id,
            parent_message_id: input.parent_message_id,
            thread_root_id: input.thread_root_id,
            depth: input.depth,
            role: input.role,
            content: input.content,
            author_id: input.author_id,
            metadata: input.metadata,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Message>> {
        let query = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?");
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(message_from_row).transpose()
    }

    async fn list_by_conversation(&self, conversation_id: Uuid) -> DbResult<Vec<Message>> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ? \
             ORDER BY created_at ASC, rowid ASC"
        );
        let rows = sqlx::query(&query)
            .bind(conversation_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(message_from_row).collect()
    }

    async fn list_by_thread_root(&self, thread_root_id: Uuid) -> DbResult<Vec<Message>> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE thread_root_id = ? \
             ORDER BY created_at ASC, rowid ASC"
        );
        let rows = sqlx::query(&query)
            .bind(thread_root_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(message_from_row).collect()
    }
}
