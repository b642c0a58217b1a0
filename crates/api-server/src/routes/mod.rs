//! Route handlers

pub mod category;
pub mod health;
pub mod task;
pub mod user;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Request,
    },
    http::{request::Parts, HeaderMap, StatusCode},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use taskdesk_core::user::{AuthorizationGate, Capability};
use taskdesk_core::Error;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type RouteError = (StatusCode, Json<ErrorResponse>);

pub fn route_error(status: StatusCode, error: impl Into<String>) -> RouteError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

fn unauthorized(error: impl Into<String>) -> RouteError {
    route_error(StatusCode::UNAUTHORIZED, error)
}

/// Map a domain error onto its HTTP status
pub fn domain_error(err: Error) -> RouteError {
    let status = match &err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Forbidden(_) => StatusCode::FORBIDDEN,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Store(_) => {
            tracing::error!(error = %err, "record store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    route_error(status, err.to_string())
}

/// Resolve the caller's capability, rejecting anonymous requests
pub async fn require_caller(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Capability, RouteError> {
    let email = state
        .auth()
        .resolve_identity(headers)
        .map_err(|err| unauthorized(err.to_string()))?
        .ok_or_else(|| unauthorized("no token found"))?;
    state
        .gate()
        .capability(Some(email.as_str()))
        .await
        .map_err(domain_error)
}

/// JSON body extractor that rejects with an `ErrorResponse`
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = RouteError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| {
                route_error(rejection.status(), rejection.body_text())
            })?;
        Ok(Self(value))
    }
}

/// Path extractor that rejects with an `ErrorResponse`
pub struct PathParams<T>(pub T);

impl<S, T> FromRequestParts<S> for PathParams<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = RouteError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: PathRejection| {
                route_error(rejection.status(), rejection.body_text())
            })?;
        Ok(Self(value))
    }
}

/// Every REST route, without middleware
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(task::router())
        .merge(category::router())
        .merge(user::router())
}
