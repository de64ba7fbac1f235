use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::ConversationRepo,
        timestamp_now,
    },
    models::{Conversation, CreateConversation},
};

pub struct PostgresConversationRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresConversationRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    fn from_row(row: &PgRow) -> Conversation {
        Conversation {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            title: row.get("title"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl ConversationRepo for PostgresConversationRepo {
    async fn create(&self, input: CreateConversation) -> DbResult<Conversation> {
        let id = Uuid::new_v4();
        let now = timestamp_now();

        sqlx::query(
            r#"
            INSERT INTO conversations (id, owner_id, title, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(&input.owner_id)
        .bind(&input.title)
        .bind(now)
        .bind(now)
        .execute(&self.write_pool)
        .await?;

        Ok(Conversation {
            id,
            owner_id: input.owner_id,
            title: input.title,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Conversation>> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, title, created_at, updated_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.read_pool)
        .await?;

        Ok(row.as_ref().map(Self::from_row))
    }

    async fn list_by_owner(&self, owner_id: &str) -> DbResult<Vec<Conversation>> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, title, created_at, updated_at
            FROM conversations
            WHERE owner_id = $1
            ORDER BY updated_at DESC, id DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.read_pool)
        .await?;

        Ok(rows.iter().map(Self::from_row).collect())
    }

    async fn set_title(&self, id: Uuid, title: &str) -> DbResult<Conversation> {
        let row = sqlx::query(
            r#"
            UPDATE conversations
            SET title = $1, updated_at = $2
            WHERE id = $3
            RETURNING id, owner_id, title, created_at, updated_at
            "#,
        )
        .bind(title)
        .bind(timestamp_now())
        .bind(id)
        .fetch_optional(&self.write_pool)
        .await?;

        row.as_ref().map(Self::from_row).ok_or(DbError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let mut tx = self.write_pool.begin().await?;

        let messages = sqlx::query("DELETE FROM messages WHERE conversation_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        tx.commit().await?;

        tracing::debug!(
            conversation_id = %id,
            messages_deleted = messages.rows_affected(),
            "Deleted conversation"
        );
        Ok(())
    }
}
