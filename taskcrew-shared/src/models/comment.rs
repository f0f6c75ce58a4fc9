/// Task comment model
///
/// Comments attach to a task and are immutable once written: there is no
/// update or delete path.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE task_comments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     author_id UUID NOT NULL REFERENCES users(id),
///     content TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A comment on a task
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A comment joined with its author's public identity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CommentWithAuthor {
    pub id: Uuid,
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_name: String,
    pub author_email: String,
}

impl Comment {
    /// Creates a comment on a task
    ///
    /// The route layer verifies the task exists and is visible to the
    /// author before calling this.
    pub async fn create(
        pool: &PgPool,
        task_id: Uuid,
        author_id: Uuid,
        content: String,
    ) -> Result<CommentWithAuthor, sqlx::Error> {
        let comment = sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            WITH inserted AS (
                INSERT INTO task_comments (task_id, author_id, content)
                VALUES ($1, $2, $3)
                RETURNING id, task_id, author_id, content, created_at
            )
            SELECT i.id, i.task_id, i.author_id, i.content, i.created_at,
                   u.name AS author_name, u.email AS author_email
            FROM inserted i
            JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(task_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(pool)
        .await?;

        Ok(comment)
    }

    /// Lists a task's comments, oldest first
    pub async fn list_by_task(
        pool: &PgPool,
        task_id: Uuid,
    ) -> Result<Vec<CommentWithAuthor>, sqlx::Error> {
        let comments = sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            SELECT c.id, c.task_id, c.author_id, c.content, c.created_at,
                   u.name AS author_name, u.email AS author_email
            FROM task_comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.task_id = $1
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await?;

        Ok(comments)
    }
}
