/// Task endpoints
///
/// Task CRUD, the caller's own task listing, team listings with
/// caller-chosen ordering, aggregate statistics, and comments. Mutations on
/// team-scoped tasks are fanned out to the team's live channel after the
/// write commits.
///
/// # Endpoints
///
/// - `POST /api/tasks` - Create a task (optionally team-scoped)
/// - `GET /api/tasks/my-tasks` - The caller's tasks, filtered + paginated
/// - `GET /api/tasks/stats` - Totals across the caller's teams
/// - `GET /api/tasks/team/:team_id` - A team's tasks, member-only
/// - `GET /api/tasks/:id` - Task detail with the caller's permissions
/// - `PUT /api/tasks/:id` - Update (creator only, allow-listed fields)
/// - `DELETE /api/tasks/:id` - Archive (creator only)
/// - `POST /api/tasks/:id/comments` - Comment on a visible task

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::ApiResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use taskcrew_shared::{
    auth::{guard, middleware::AuthContext},
    models::{
        comment::{Comment, CommentWithAuthor},
        membership::{Membership, MembershipRole},
        task::{
            CreateTask, SortOrder, Task, TaskFilter, TaskPriority, TaskSortBy, TaskStats,
            TaskStatus, UpdateTask,
        },
        team::Team,
        PageParams,
    },
    realtime::{EventKind, TeamEvent},
};
use uuid::Uuid;

/// Create task request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub team_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
}

/// Update task request
///
/// Only the allow-listed fields are reachable; anything else in the body
/// is ignored by deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
}

/// Comment request
#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub content: String,
}

/// Filters for the caller's own tasks
#[derive(Debug, Deserialize)]
pub struct MyTasksQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Filters and ordering for a team's tasks
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamTasksQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskData {
    pub task: Task,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetailData {
    pub task: Task,
    pub permissions: TaskPermissionsData,
}

/// The caller's rights over one task
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPermissionsData {
    pub can_edit: bool,
    pub can_delete: bool,
}

#[derive(Debug, Serialize)]
pub struct TaskListData {
    pub tasks: Vec<Task>,
    pub count: usize,
    pub total: i64,
    pub page: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize)]
pub struct CommentData {
    pub comment: CommentWithAuthor,
}

#[derive(Debug, Serialize)]
pub struct MessageData {
    pub message: String,
}

/// Loads a live (non-archived) task or surfaces not-found
async fn load_task(state: &AppState, task_id: Uuid) -> ApiResult<Task> {
    Task::find_by_id(&state.db, task_id)
        .await?
        .filter(|t| !t.is_archived)
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

/// The caller's role in the task's team, when the task has one
async fn role_in_task_team(
    state: &AppState,
    task: &Task,
    user_id: Uuid,
) -> ApiResult<Option<MembershipRole>> {
    match task.team_id {
        Some(team_id) => Ok(Membership::get_role(&state.db, team_id, user_id).await?),
        None => Ok(None),
    }
}

/// Fans a task event out to the task's team channel, if any
///
/// Fire-and-forget: a failed or empty delivery never affects the API
/// response.
async fn publish_task_event(state: &AppState, team_id: Option<Uuid>, kind: EventKind, payload: serde_json::Value) {
    if let Some(team_id) = team_id {
        let delivered = state
            .channels
            .publish(team_id, TeamEvent::new(kind, team_id, payload))
            .await;
        tracing::debug!(team_id = %team_id, kind = kind.as_str(), delivered, "Published task event");
    }
}

/// Create a new task
///
/// Status defaults to todo and priority to medium. A team-scoped task
/// requires membership, and for plain members the team's
/// `memberCanCreate` setting.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<TaskData>>)> {
    if req.title.trim().is_empty() {
        return Err(ApiError::Validation("Task title is required".to_string()));
    }

    if let Some(team_id) = req.team_id {
        let team = Team::find_by_id(&state.db, team_id)
            .await?
            .filter(|t| t.is_active)
            .ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

        let role = Membership::get_role(&state.db, team_id, auth.user_id).await?;
        if !guard::can_create_team_task(&team.settings, role) {
            return Err(ApiError::Forbidden(
                "Access denied. You cannot create tasks in this team.".to_string(),
            ));
        }
    }

    let task = Task::create(
        &state.db,
        CreateTask {
            title: req.title.trim().to_string(),
            description: req.description,
            status: req.status,
            priority: req.priority,
            due_date: req.due_date,
            creator_id: auth.user_id,
            team_id: req.team_id,
            assignee_id: req.assignee_id,
        },
    )
    .await?;

    publish_task_event(&state, task.team_id, EventKind::TaskCreated, json!(task)).await;

    Ok(ApiResponse::created(TaskData { task }))
}

/// The caller's tasks, filtered and paginated, newest first
pub async fn get_my_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<MyTasksQuery>,
) -> ApiResult<Json<ApiResponse<TaskListData>>> {
    let page = PageParams::from_query(query.page, query.limit);
    let filter = TaskFilter {
        status: query.status,
        priority: query.priority,
        assignee_id: None,
    };

    let result = Task::list_by_creator(&state.db, auth.user_id, filter, page).await?;

    Ok(ApiResponse::ok(TaskListData {
        count: result.items.len(),
        tasks: result.items,
        total: result.total,
        page: result.page,
        pages: result.pages,
    }))
}

/// A team's tasks, member-only, with caller-chosen ordering
pub async fn get_team_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(team_id): Path<Uuid>,
    Query(query): Query<TeamTasksQuery>,
) -> ApiResult<Json<ApiResponse<TaskListData>>> {
    Team::find_by_id(&state.db, team_id)
        .await?
        .filter(|t| t.is_active)
        .ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

    if Membership::get_role(&state.db, team_id, auth.user_id)
        .await?
        .is_none()
    {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }

    let sort_by = match query.sort_by.as_deref() {
        Some(value) => TaskSortBy::parse(value)
            .ok_or_else(|| ApiError::Validation(format!("Invalid sort field: {}", value)))?,
        None => TaskSortBy::CreatedAt,
    };
    let sort_order = query
        .sort_order
        .as_deref()
        .map(SortOrder::parse)
        .unwrap_or(SortOrder::Desc);

    let page = PageParams::from_query(query.page, query.limit);
    let filter = TaskFilter {
        status: query.status,
        priority: query.priority,
        assignee_id: query.assigned_to,
    };

    let result = Task::list_by_team(&state.db, team_id, filter, page, sort_by, sort_order).await?;

    Ok(ApiResponse::ok(TaskListData {
        count: result.items.len(),
        tasks: result.items,
        total: result.total,
        page: result.page,
        pages: result.pages,
    }))
}

/// Aggregate statistics across the caller's teams
pub async fn get_task_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ApiResponse<TaskStats>>> {
    let stats = Task::stats_for_user(&state.db, auth.user_id).await?;
    Ok(ApiResponse::ok(stats))
}

/// Task detail
///
/// Team tasks are visible to any team member; personal tasks only to
/// their creator.
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<TaskDetailData>>> {
    let task = load_task(&state, task_id).await?;

    let role = role_in_task_team(&state, &task, auth.user_id).await?;
    if !guard::can_view_task(&task, role, auth.user_id) {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }

    let permissions = TaskPermissionsData {
        can_edit: guard::can_edit_task(&task, auth.user_id),
        can_delete: guard::can_delete_task(&task, auth.user_id),
    };

    Ok(ApiResponse::ok(TaskDetailData { task, permissions }))
}

/// Update a task (creator only)
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<ApiResponse<TaskData>>> {
    let task = load_task(&state, task_id).await?;

    if !guard::can_edit_task(&task, auth.user_id) {
        return Err(ApiError::Forbidden(
            "Access denied. Cannot edit this task.".to_string(),
        ));
    }

    let updated = Task::update(
        &state.db,
        task_id,
        UpdateTask {
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            due_date: req.due_date,
            assignee_id: req.assignee_id,
        },
    )
    .await?;

    publish_task_event(&state, updated.team_id, EventKind::TaskUpdated, json!(updated)).await;

    Ok(ApiResponse::ok(TaskData { task: updated }))
}

/// Archive a task (creator only)
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<MessageData>>> {
    let task = load_task(&state, task_id).await?;

    if !guard::can_delete_task(&task, auth.user_id) {
        return Err(ApiError::Forbidden(
            "Access denied. Cannot delete this task.".to_string(),
        ));
    }

    Task::archive(&state.db, task_id).await?;

    Ok(ApiResponse::ok(MessageData {
        message: "Task deleted successfully".to_string(),
    }))
}

/// Comment on a task
///
/// Requires the same visibility as reading the task.
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<AddCommentRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<CommentData>>)> {
    if req.content.trim().is_empty() {
        return Err(ApiError::Validation(
            "Comment content is required".to_string(),
        ));
    }

    let task = load_task(&state, task_id).await?;

    let role = role_in_task_team(&state, &task, auth.user_id).await?;
    if !guard::can_view_task(&task, role, auth.user_id) {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }

    let comment = Comment::create(&state.db, task_id, auth.user_id, req.content).await?;

    publish_task_event(
        &state,
        task.team_id,
        EventKind::NewComment,
        json!({ "taskId": task_id, "comment": comment }),
    )
    .await;

    Ok(ApiResponse::created(CommentData { comment }))
}
