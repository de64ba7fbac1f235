use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::MessageRepo,
        timestamp_now,
    },
    models::{Message, MessageMetadata, NewMessage},
};

const MESSAGE_COLUMNS: &str = "id, conversation_id, parent_message_id, thread_root_id, depth, \
     role, content, author_id, metadata, created_at";

pub struct PostgresMessageRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresMessageRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    fn from_row(row: &PgRow) -> DbResult<Message> {
        let role: String = row.get("role");
        let metadata: Option<serde_json::Value> = row.get("metadata");

        Ok(Message {
            id: row.get("id"),
            conversation_id: row.get("conversation_id"),
            parent_message_id: row.get("parent_message_id"),
            thread_root_id: row.get("thread_root_id"),
            depth: row.get("depth"),
            role: role.parse().map_err(DbError::Internal)?,
            content: row.get("content"),
            author_id: row.get("author_id"),
            metadata: metadata
                .map(serde_json::from_value::<MessageMetadata>)
                .transpose()?,
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl MessageRepo for PostgresMessageRepo {
    async fn create(&self, input: NewMessage) -> DbResult<Message> {
        let now = timestamp_now();
        let metadata_json = input
            .metadata
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        let mut tx = self.write_pool.begin().await?;

        let touched = sqlx::query("UPDATE conversations SET updated_at = $1 WHERE id = $2")
            .bind(now)
            .bind(input.conversation_id)
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
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(input.id)
        .bind(input.conversation_id)
        .bind(input.parent_message_id)
        .bind(input.thread_root_id)
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
        let query = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.read_pool)
            .await?;

        row.as_ref().map(Self::from_row).transpose()
    }

    async fn list_by_conversation(&self, conversation_id: Uuid) -> DbResult<Vec<Message>> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = $1 \
             ORDER BY created_at ASC, seq ASC"
        );
        let rows = sqlx::query(&query)
            .bind(conversation_id)
            .fetch_all(&self.read_pool)
            .await?;

        rows.iter().map(Self::from_row).collect()
    }

    async fn list_by_thread_root(&self, thread_root_id: Uuid) -> DbResult<Vec<Message>> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE thread_root_id = $1 \
             ORDER BY created_at ASC, seq ASC"
        );
        let rows = sqlx::query(&query)
            .bind(thread_root_id)
            .fetch_all(&self.read_pool)
            .await?;

        rows.iter().map(Self::from_row).collect()
    }
}
