//! Health check endpoint

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    store: &'static str,
}

/// Liveness plus a read against the record store
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, store) = match state.categories().list().await {
        Ok(_) => (StatusCode::OK, "ok"),
        Err(err) => {
            tracing::error!(error = %err, "health check could not read the record store");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };
    let body = HealthResponse {
        status: if status.is_success() { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        store,
    };
    (status, Json(body))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
