use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::message::Message;

#[derive(Clone)]
pub struct MessageService {
    pool: PgPool,
}

/// Appends a notification to a CV's log. Usable inside a caller's transaction.
pub async fn append<'e, E: PgExecutor<'e>>(executor: E, cv_id: Uuid, text: &str) -> Result<Message> {
    let message = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (cv_id, message)
        VALUES ($1, $2)
        RETURNING id, cv_id, message, read, created_at
        "#,
    )
    .bind(cv_id)
    .bind(text)
    .fetch_one(executor)
    .await?;

    Ok(message)
}

impl MessageService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, cv_id: Uuid, text: &str) -> Result<Message> {
        let message = append(&self.pool, cv_id, text).await?;
        tracing::info!(cv_id = %cv_id, message_id = %message.id, "message sent");
        Ok(message)
    }

    pub async fn list_for_cv(&self, cv_id: Uuid) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, cv_id, message, read, created_at FROM messages
            WHERE cv_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(cv_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    pub async fn mark_read(&self, cv_id: Uuid, message_id: Uuid) -> Result<Message> {
        sqlx::query_as::<_, Message>(
            r#"
            UPDATE messages
            SET read = TRUE
            WHERE id = $1 AND cv_id = $2
            RETURNING id, cv_id, message, read, created_at
            "#,
        )
        .bind(message_id)
        .bind(cv_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Message not found".into()))
    }

    pub async fn mark_all_read(&self, cv_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET read = TRUE
            WHERE cv_id = $1 AND read = FALSE
            "#,
        )
        .bind(cv_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn unread_count(&self, cv_id: Uuid) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM messages
            WHERE cv_id = $1 AND read = FALSE
            "#,
        )
        .bind(cv_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    pub async fn total_unread_count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM messages
            WHERE read = FALSE
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }
}
