//! Health check handlers.

use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::state::AppState;

/// Build the health router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let Some(pool) = state.pool() else {
        return StatusCode::OK;
    };
    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
