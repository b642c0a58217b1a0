//! Task API endpoints
//!
//! Listing, lifecycle verbs (lock/unlock/delete) and user assignment.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;

use taskdesk_core::category::TaskCategory;
use taskdesk_core::task::{FilterSet, Task, TaskInput, TaskStatus};
use taskdesk_core::user::User;

use super::{domain_error, require_caller, JsonBody, PathParams, RouteError};
use crate::state::AppState;

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    pub status: TaskStatus,
    pub author_id: i64,
    pub task_category_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            name: task.name,
            description: task.description,
            start_date: task.start_date.to_rfc3339(),
            end_date: task.end_date.to_rfc3339(),
            status: task.status,
            author_id: task.author_id,
            task_category_id: task.task_category_id,
            created_at: task.created_at.to_rfc3339(),
            updated_at: task.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub status: &'static str,
}

const SUCCESS: SuccessResponse = SuccessResponse { status: "success" };

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/tasks - List tasks matching query filters
async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<TaskResponse>>, RouteError> {
    let filters = FilterSet::from_params(params).map_err(domain_error)?;
    let tasks = state.tasks().list(&filters).await.map_err(domain_error)?;
    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

/// GET /api/tasks/count - Count tasks matching query filters
async fn count_tasks(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<CountResponse>, RouteError> {
    let filters = FilterSet::from_params(params).map_err(domain_error)?;
    let count = state.tasks().count(&filters).await.map_err(domain_error)?;
    Ok(Json(CountResponse { count }))
}

/// POST /api/tasks - Create a task
async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(input): JsonBody<TaskInput>,
) -> Result<(StatusCode, Json<TaskResponse>), RouteError> {
    let capability = require_caller(&state, &headers).await?;
    let task = state
        .tasks()
        .create(input, capability)
        .await
        .map_err(domain_error)?;
    Ok((StatusCode::CREATED, Json(TaskResponse::from(task))))
}

/// GET /api/tasks/{id} - Get a single task
async fn get_task(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
) -> Result<Json<TaskResponse>, RouteError> {
    let task = state.tasks().get(id).await.map_err(domain_error)?;
    Ok(Json(TaskResponse::from(task)))
}

/// PUT /api/tasks/{id} - Replace a task's editable fields
async fn update_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    PathParams(id): PathParams<i64>,
    JsonBody(input): JsonBody<TaskInput>,
) -> Result<Json<TaskResponse>, RouteError> {
    let capability = require_caller(&state, &headers).await?;
    let task = state
        .tasks()
        .edit(id, input, capability)
        .await
        .map_err(domain_error)?;
    Ok(Json(TaskResponse::from(task)))
}

/// DELETE /api/tasks/{id} - Delete a task
async fn delete_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    PathParams(id): PathParams<i64>,
) -> Result<Json<SuccessResponse>, RouteError> {
    let capability = require_caller(&state, &headers).await?;
    state
        .tasks()
        .delete(id, capability)
        .await
        .map_err(domain_error)?;
    Ok(Json(SUCCESS))
}

/// PATCH /api/tasks/{id}/lock - Lock a task
async fn lock_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    PathParams(id): PathParams<i64>,
) -> Result<Json<TaskResponse>, RouteError> {
    let capability = require_caller(&state, &headers).await?;
    let task = state
        .tasks()
        .lock(id, capability)
        .await
        .map_err(domain_error)?;
    Ok(Json(TaskResponse::from(task)))
}

/// PATCH /api/tasks/{id}/unlock - Unlock a task
async fn unlock_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    PathParams(id): PathParams<i64>,
) -> Result<Json<TaskResponse>, RouteError> {
    let capability = require_caller(&state, &headers).await?;
    let task = state
        .tasks()
        .unlock(id, capability)
        .await
        .map_err(domain_error)?;
    Ok(Json(TaskResponse::from(task)))
}

/// GET /api/tasks/{id}/category - The category a task belongs to
async fn get_task_category(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
) -> Result<Json<TaskCategory>, RouteError> {
    let task = state.tasks().get(id).await.map_err(domain_error)?;
    let category = state
        .categories()
        .get(task.task_category_id)
        .await
        .map_err(domain_error)?;
    Ok(Json(category))
}

/// GET /api/tasks/{id}/users - Users assigned to a task
async fn list_task_users(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
) -> Result<Json<Vec<User>>, RouteError> {
    let users = state.tasks().assignees(id).await.map_err(domain_error)?;
    Ok(Json(users))
}

/// POST /api/tasks/{id}/users/{user_id} - Assign a user to a task
async fn assign_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    PathParams((id, user_id)): PathParams<(i64, i64)>,
) -> Result<Json<SuccessResponse>, RouteError> {
    let capability = require_caller(&state, &headers).await?;
    state
        .tasks()
        .assign(id, user_id, capability)
        .await
        .map_err(domain_error)?;
    Ok(Json(SUCCESS))
}

/// DELETE /api/tasks/{id}/users/{user_id} - Remove a user from a task
async fn unassign_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    PathParams((id, user_id)): PathParams<(i64, i64)>,
) -> Result<Json<SuccessResponse>, RouteError> {
    let capability = require_caller(&state, &headers).await?;
    state
        .tasks()
        .unassign(id, user_id, capability)
        .await
        .map_err(domain_error)?;
    Ok(Json(SUCCESS))
}

// ============================================================================
// Router
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/count", get(count_tasks))
        .route(
            "/api/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/api/tasks/{id}/lock", patch(lock_task))
        .route("/api/tasks/{id}/unlock", patch(unlock_task))
        .route("/api/tasks/{id}/category", get(get_task_category))
        .route("/api/tasks/{id}/users", get(list_task_users))
        .route(
            "/api/tasks/{id}/users/{user_id}",
            post(assign_user).delete(unassign_user),
        )
}
