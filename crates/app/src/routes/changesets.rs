//! Changeset history and revert handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use batchwise_core::ChangesetId;
use batchwise_core::bulk::{ExecutionReport, RevertScope};
use batchwise_core::ports::{ChangesetRecord, ChangesetSummary};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::BulkEditService;
use crate::state::AppState;

const DEFAULT_LIST_LIMIT: u32 = 20;

/// Build the changesets router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/changesets", get(list))
        .route("/api/changesets/{id}", get(show))
        .route("/api/changesets/{id}/revert", post(revert_batch))
        .route(
            "/api/changesets/{id}/changes/{index}/revert",
            post(revert_change),
        )
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
}

/// Recent changesets, newest first.
///
/// # Errors
///
/// Returns 500 if the audit store cannot be read.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ChangesetSummary>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    Ok(Json(BulkEditService::new(&state).list(limit).await?))
}

/// One changeset with its recorded changes.
///
/// # Errors
///
/// Returns 404 if the changeset does not exist.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChangesetRecord>, AppError> {
    let record = BulkEditService::new(&state)
        .get(ChangesetId::from_uuid(id))
        .await?;
    Ok(Json(record))
}

/// Undo every recorded change of a changeset.
///
/// # Errors
///
/// Returns 404 if the changeset does not exist, 409 if it was already
/// reverted.
pub async fn revert_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExecutionReport>, AppError> {
    let report = BulkEditService::new(&state)
        .revert(ChangesetId::from_uuid(id), RevertScope::Batch)
        .await?;
    Ok(Json(report))
}

/// Undo one recorded change.
///
/// # Errors
///
/// Returns 404 if the changeset or the change does not exist.
pub async fn revert_change(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<ExecutionReport>, AppError> {
    let report = BulkEditService::new(&state)
        .revert(ChangesetId::from_uuid(id), RevertScope::Single(index))
        .await?;
    Ok(Json(report))
}
