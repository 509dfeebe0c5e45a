//! Bulk-edit wizard handlers.

use axum::{Json, Router, extract::State, routing::{get, post}};

use crate::error::AppError;
use crate::services::{
    ApplyResponse, BulkEditRequest, BulkEditService, PreviewResponse, UsageResponse,
};
use crate::state::AppState;

/// Build the bulk-edit router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/bulk-edit/preview", post(preview))
        .route("/api/bulk-edit/apply", post(apply))
        .route("/api/usage", get(usage))
}

/// Plan a bulk edit without applying it.
///
/// # Errors
///
/// Returns 400 if the request does not validate, 502 if the catalog cannot
/// be read.
pub async fn preview(
    State(state): State<AppState>,
    Json(body): Json<BulkEditRequest>,
) -> Result<Json<PreviewResponse>, AppError> {
    let preview = BulkEditService::new(&state).preview(&body).await?;
    Ok(Json(preview))
}

/// Plan and apply a bulk edit.
///
/// # Errors
///
/// Returns 429 when the monthly limit is reached, 400 if the request does
/// not validate, 502 if the catalog cannot be read.
pub async fn apply(
    State(state): State<AppState>,
    Json(body): Json<BulkEditRequest>,
) -> Result<Json<ApplyResponse>, AppError> {
    let applied = BulkEditService::new(&state).apply(&body).await?;
    tracing::info!(
        changeset_id = ?applied.changeset_id,
        success_count = applied.report.success_count,
        error_count = applied.report.error_count,
        "Bulk edit applied"
    );
    Ok(Json(applied))
}

/// Current monthly usage.
///
/// # Errors
///
/// Returns 500 if usage cannot be read.
pub async fn usage(State(state): State<AppState>) -> Result<Json<UsageResponse>, AppError> {
    Ok(Json(BulkEditService::new(&state).usage().await?))
}
