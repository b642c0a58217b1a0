//! User endpoints

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};

use taskdesk_core::user::User;

use super::task::TaskResponse;
use super::{domain_error, require_caller, PathParams, RouteError};
use crate::state::AppState;

/// GET /api/users - All users, ascending by ID
async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, RouteError> {
    let users = state.users().list().await.map_err(domain_error)?;
    Ok(Json(users))
}

/// GET /api/users/{id}
async fn get_user(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
) -> Result<Json<User>, RouteError> {
    let user = state.users().get(id).await.map_err(domain_error)?;
    Ok(Json(user))
}

/// DELETE /api/users/{id} - Remove a user and their assignments
async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    PathParams(id): PathParams<i64>,
) -> Result<StatusCode, RouteError> {
    let capability = require_caller(&state, &headers).await?;
    state
        .users()
        .delete(id, capability)
        .await
        .map_err(domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/{id}/tasks - Tasks the user is assigned to
async fn list_user_tasks(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
) -> Result<Json<Vec<TaskResponse>>, RouteError> {
    let tasks = state.tasks().assigned_to(id).await.map_err(domain_error)?;
    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/{id}", get(get_user).delete(delete_user))
        .route("/api/users/{id}/tasks", get(list_user_tasks))
}
