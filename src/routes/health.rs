use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Serialize)]
struct HealthReport {
    version: &'static str,
    database: &'static str,
}

/// `GET /health`
pub fn root_router() -> Router<AppState> {
    Router::new().route("/health", get(liveness))
}

/// `GET /api/health`
pub fn api_router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn liveness() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Reports the crate version and whether the database answers a ping.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match state.db.ping().await {
        Ok(()) => "connected",
        Err(err) => {
            tracing::warn!(error = %err, "Database ping failed");
            "disconnected"
        }
    };

    ApiResponse::ok(
        "Service is healthy",
        HealthReport {
            version: env!("CARGO_PKG_VERSION"),
            database,
        },
    )
}
