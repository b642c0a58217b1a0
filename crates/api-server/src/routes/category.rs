//! Task category endpoints

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};

use taskdesk_core::category::{CategoryInput, TaskCategory};

use super::{domain_error, require_caller, JsonBody, PathParams, RouteError};
use crate::state::AppState;

/// GET /api/categories
async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<TaskCategory>>, RouteError> {
    let categories = state.categories().list().await.map_err(domain_error)?;
    Ok(Json(categories))
}

/// POST /api/categories
async fn create_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(input): JsonBody<CategoryInput>,
) -> Result<(StatusCode, Json<TaskCategory>), RouteError> {
    let capability = require_caller(&state, &headers).await?;
    let category = state
        .categories()
        .create(input, capability)
        .await
        .map_err(domain_error)?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /api/categories/{id}
async fn get_category(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
) -> Result<Json<TaskCategory>, RouteError> {
    let category = state.categories().get(id).await.map_err(domain_error)?;
    Ok(Json(category))
}

/// PUT /api/categories/{id}
async fn rename_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    PathParams(id): PathParams<i64>,
    JsonBody(input): JsonBody<CategoryInput>,
) -> Result<Json<TaskCategory>, RouteError> {
    let capability = require_caller(&state, &headers).await?;
    let category = state
        .categories()
        .rename(id, input, capability)
        .await
        .map_err(domain_error)?;
    Ok(Json(category))
}

/// DELETE /api/categories/{id}
async fn delete_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    PathParams(id): PathParams<i64>,
) -> Result<StatusCode, RouteError> {
    let capability = require_caller(&state, &headers).await?;
    state
        .categories()
        .delete(id, capability)
        .await
        .map_err(domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/categories",
            get(list_categories).post(create_category),
        )
        .route(
            "/api/categories/{id}",
            get(get_category)
                .put(rename_category)
                .delete(delete_category),
        )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use taskdesk_core::store::FileStore;
    use taskdesk_core::task::{NewTask, TaskInput, TaskRepository};
    use taskdesk_core::user::{NewUser, Role, UserRepository};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::auth::AuthConfig;

    async fn setup() -> (Router, Arc<FileStore>, String, String, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(FileStore::new(temp.path().join("store.json")).await.unwrap());
        UserRepository::insert(
            store.as_ref(),
            NewUser::new("Boss", "boss@example.com", Role::Manager),
        )
        .await
        .unwrap();
        UserRepository::insert(
            store.as_ref(),
            NewUser::new("Dev", "dev@example.com", Role::User),
        )
        .await
        .unwrap();

        let state = AppState::with_store(store.clone(), AuthConfig::new("test-secret"));
        let manager = state.auth().issue_token("boss@example.com", 1).unwrap();
        let member = state.auth().issue_token("dev@example.com", 1).unwrap();
        let app = crate::routes::router().with_state(state);
        (app, store, manager, member, temp)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_category_lifecycle_for_manager() {
        let (app, _store, manager, _member, _temp) = setup().await;

        let (status, created) = send(
            &app,
            "POST",
            "/api/categories",
            Some(manager.as_str()),
            Some(json!({"name": "  Backend  "})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["name"], "Backend");
        let uri = format!("/api/categories/{}", created["id"]);

        let (status, renamed) = send(
            &app,
            "PUT",
            &uri,
            Some(manager.as_str()),
            Some(json!({"name": "Platform"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(renamed["name"], "Platform");

        let (_, listed) = send(&app, "GET", "/api/categories", None, None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, _) = send(&app, "DELETE", &uri, Some(manager.as_str()), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_member_cannot_write_categories() {
        let (app, _store, _manager, member, _temp) = setup().await;

        let (status, _) = send(
            &app,
            "POST",
            "/api/categories",
            None,
            Some(json!({"name": "Ops"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &app,
            "POST",
            "/api/categories",
            Some(member.as_str()),
            Some(json!({"name": "Ops"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].is_string());

        let (status, _) = send(&app, "DELETE", "/api/categories/404", Some(member.as_str()), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_category_in_use_cannot_be_deleted() {
        let (app, store, manager, _member, _temp) = setup().await;
        let (_, created) = send(
            &app,
            "POST",
            "/api/categories",
            Some(manager.as_str()),
            Some(json!({"name": "Design"})),
        )
        .await;
        let category_id = created["id"].as_i64().unwrap();
        TaskRepository::insert(
            store.as_ref(),
            NewTask::new(TaskInput::new("Mockups", 1, category_id)),
        )
        .await
        .unwrap();

        let (status, _) = send(
            &app,
            "DELETE",
            &format!("/api/categories/{}", category_id),
            Some(manager.as_str()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
