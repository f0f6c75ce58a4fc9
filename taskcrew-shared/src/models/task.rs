/// Task model and database operations
///
/// Tasks are owned by their creator and optionally scoped to a team. They
/// carry a workflow status and a priority, and follow the repository-wide
/// soft-delete policy: deletion flips `is_archived` and listings filter
/// archived rows out.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'in_progress', 'review', 'completed');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'todo',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     due_date TIMESTAMPTZ,
///     creator_id UUID NOT NULL REFERENCES users(id),
///     team_id UUID REFERENCES teams(id) ON DELETE CASCADE,
///     assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     is_archived BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::{PageParams, Paginated};

/// Workflow status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Completed => "completed",
        }
    }

    /// Pending statuses counted by the statistics query
    pub fn is_pending(&self) -> bool {
        !matches!(self, TaskStatus::Completed)
    }
}

/// Priority of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Task title
    pub title: String,

    /// Optional free-form description
    pub description: Option<String>,

    /// Workflow status (defaults to todo)
    pub status: TaskStatus,

    /// Priority (defaults to medium)
    pub priority: TaskPriority,

    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,

    /// The user who created the task; only they may edit or delete it
    pub creator_id: Uuid,

    /// Team scope, if any; personal tasks have none
    pub team_id: Option<Uuid>,

    /// Optional single assignee
    pub assignee_id: Option<Uuid>,

    /// True once the task is soft-deleted
    pub is_archived: bool,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub creator_id: Uuid,
    pub team_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
}

/// Input for updating a task, restricted to the mutable allow-list
///
/// Fields left as None keep their stored values; anything outside this
/// struct (creator, team scope, archive flag) is not reachable through the
/// update path.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
}

/// Optional filters applied to task listings
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Uuid>,
}

/// Sortable columns for team task listings
///
/// An allow-list: the API maps caller-supplied strings through
/// [`TaskSortBy::parse`] and rejects anything else, so no caller input ever
/// reaches the ORDER BY clause directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSortBy {
    CreatedAt,
    DueDate,
    Priority,
    Status,
    Title,
}

impl TaskSortBy {
    /// Parses a caller-supplied sort field (camelCase, as on the wire)
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "createdAt" => Some(TaskSortBy::CreatedAt),
            "dueDate" => Some(TaskSortBy::DueDate),
            "priority" => Some(TaskSortBy::Priority),
            "status" => Some(TaskSortBy::Status),
            "title" => Some(TaskSortBy::Title),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            TaskSortBy::CreatedAt => "created_at",
            TaskSortBy::DueDate => "due_date",
            TaskSortBy::Priority => "priority",
            TaskSortBy::Status => "status",
            TaskSortBy::Title => "title",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Parses a caller-supplied direction; anything but "asc" sorts
    /// descending, matching the listing default of newest first.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }

    fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Aggregate task statistics across a user's teams
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    /// Non-archived tasks in all teams the user belongs to
    pub total_tasks: i64,

    /// Number of active teams the user belongs to
    pub teams: i64,

    /// Tasks whose status is todo, in_progress, or review
    pub pending_tasks: i64,
}

impl Task {
    /// Creates a new task
    ///
    /// Status defaults to todo and priority to medium when not supplied.
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (title, description, status, priority, due_date,
                               creator_id, team_id, assignee_id)
            VALUES ($1, $2, COALESCE($3, 'todo'), COALESCE($4, 'medium'), $5, $6, $7, $8)
            RETURNING id, title, description, status, priority, due_date,
                      creator_id, team_id, assignee_id, is_archived,
                      created_at, updated_at
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.due_date)
        .bind(data.creator_id)
        .bind(data.team_id)
        .bind(data.assignee_id)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID (archived rows included; callers treat archived
    /// tasks as deleted)
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, status, priority, due_date,
                   creator_id, team_id, assignee_id, is_archived,
                   created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists a creator's tasks, filtered and paginated, newest first
    ///
    /// Returns the page slice together with the total matching count and
    /// the computed page count. Requesting a page past the end yields an
    /// empty slice with the same total.
    pub async fn list_by_creator(
        pool: &PgPool,
        creator_id: Uuid,
        filter: TaskFilter,
        page: PageParams,
    ) -> Result<Paginated<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, status, priority, due_date,
                   creator_id, team_id, assignee_id, is_archived,
                   created_at, updated_at
            FROM tasks
            WHERE creator_id = $1 AND is_archived = FALSE
              AND ($2::task_status IS NULL OR status = $2)
              AND ($3::task_priority IS NULL OR priority = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(creator_id)
        .bind(filter.status)
        .bind(filter.priority)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM tasks
            WHERE creator_id = $1 AND is_archived = FALSE
              AND ($2::task_status IS NULL OR status = $2)
              AND ($3::task_priority IS NULL OR priority = $3)
            "#,
        )
        .bind(creator_id)
        .bind(filter.status)
        .bind(filter.priority)
        .fetch_one(pool)
        .await?;

        Ok(Paginated::new(tasks, total, page))
    }

    /// Lists a team's tasks with caller-chosen ordering
    ///
    /// The sort column comes from the [`TaskSortBy`] allow-list, so the
    /// formatted ORDER BY clause only ever contains known identifiers.
    pub async fn list_by_team(
        pool: &PgPool,
        team_id: Uuid,
        filter: TaskFilter,
        page: PageParams,
        sort_by: TaskSortBy,
        sort_order: SortOrder,
    ) -> Result<Paginated<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT id, title, description, status, priority, due_date,
                   creator_id, team_id, assignee_id, is_archived,
                   created_at, updated_at
            FROM tasks
            WHERE team_id = $1 AND is_archived = FALSE
              AND ($2::task_status IS NULL OR status = $2)
              AND ($3::task_priority IS NULL OR priority = $3)
              AND ($4::uuid IS NULL OR assignee_id = $4)
            ORDER BY {} {}
            LIMIT $5 OFFSET $6
            "#,
            sort_by.column(),
            sort_order.keyword(),
        );

        let tasks = sqlx::query_as::<_, Task>(&query)
            .bind(team_id)
            .bind(filter.status)
            .bind(filter.priority)
            .bind(filter.assignee_id)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM tasks
            WHERE team_id = $1 AND is_archived = FALSE
              AND ($2::task_status IS NULL OR status = $2)
              AND ($3::task_priority IS NULL OR priority = $3)
              AND ($4::uuid IS NULL OR assignee_id = $4)
            "#,
        )
        .bind(team_id)
        .bind(filter.status)
        .bind(filter.priority)
        .bind(filter.assignee_id)
        .fetch_one(pool)
        .await?;

        Ok(Paginated::new(tasks, total, page))
    }

    /// Lists a user's open assigned tasks (for the profile view)
    pub async fn list_open_for_assignee(
        pool: &PgPool,
        assignee_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, status, priority, due_date,
                   creator_id, team_id, assignee_id, is_archived,
                   created_at, updated_at
            FROM tasks
            WHERE assignee_id = $1 AND status <> 'completed' AND is_archived = FALSE
            ORDER BY created_at DESC
            "#,
        )
        .bind(assignee_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Updates a task's allow-listed fields
    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                priority = COALESCE($5, priority),
                due_date = COALESCE($6, due_date),
                assignee_id = COALESCE($7, assignee_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, description, status, priority, due_date,
                      creator_id, team_id, assignee_id, is_archived,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.due_date)
        .bind(data.assignee_id)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Soft-deletes a task by flipping `is_archived`
    pub async fn archive(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tasks SET is_archived = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        tracing::info!(task_id = %id, "Task archived");
        Ok(())
    }

    /// Computes aggregate statistics across the active teams a user
    /// belongs to
    pub async fn stats_for_user(pool: &PgPool, user_id: Uuid) -> Result<TaskStats, sqlx::Error> {
        let teams: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM memberships m
            JOIN teams t ON t.id = m.team_id
            WHERE m.user_id = $1 AND t.is_active = TRUE
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        let total_tasks: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM tasks ta
            JOIN memberships m ON m.team_id = ta.team_id
            JOIN teams t ON t.id = ta.team_id
            WHERE m.user_id = $1 AND t.is_active = TRUE AND ta.is_archived = FALSE
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        let pending_tasks: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM tasks ta
            JOIN memberships m ON m.team_id = ta.team_id
            JOIN teams t ON t.id = ta.team_id
            WHERE m.user_id = $1 AND t.is_active = TRUE AND ta.is_archived = FALSE
              AND ta.status IN ('todo', 'in_progress', 'review')
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(TaskStats {
            total_tasks,
            teams,
            pending_tasks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::from_str::<TaskStatus>("\"todo\"").unwrap(),
            TaskStatus::Todo
        );
    }

    #[test]
    fn test_pending_statuses() {
        assert!(TaskStatus::Todo.is_pending());
        assert!(TaskStatus::InProgress.is_pending());
        assert!(TaskStatus::Review.is_pending());
        assert!(!TaskStatus::Completed.is_pending());
    }

    #[test]
    fn test_sort_by_allow_list() {
        assert_eq!(TaskSortBy::parse("createdAt"), Some(TaskSortBy::CreatedAt));
        assert_eq!(TaskSortBy::parse("dueDate"), Some(TaskSortBy::DueDate));
        assert_eq!(TaskSortBy::parse("title"), Some(TaskSortBy::Title));

        // Unknown columns never reach the query.
        assert_eq!(TaskSortBy::parse("created_at"), None);
        assert_eq!(TaskSortBy::parse("id; DROP TABLE tasks"), None);
        assert_eq!(TaskSortBy::parse(""), None);
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!(SortOrder::parse("asc"), SortOrder::Asc);
        assert_eq!(SortOrder::parse("ASC"), SortOrder::Asc);
        assert_eq!(SortOrder::parse("desc"), SortOrder::Desc);
        assert_eq!(SortOrder::parse("anything"), SortOrder::Desc);
    }
}
