//! Unified error handling for the app.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use batchwise_core::{BulkEditError, CatalogError, StoreError};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::shopify::AdminShopifyError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// The engine rejected the request.
    #[error("{0}")]
    BulkEdit(#[from] BulkEditError),

    /// Storage collaborator failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Catalog could not be read.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] AdminShopifyError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request could not be authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::BulkEdit(err) => match err {
                BulkEditError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
                BulkEditError::ChangeNotFound(_) => StatusCode::NOT_FOUND,
                BulkEditError::AlreadyReverted(_) => StatusCode::CONFLICT,
                BulkEditError::Collaborator(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Store(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Catalog(_) | Self::Shopify(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_string(),
            StatusCode::BAD_GATEWAY => "External service error".to_string(),
            _ => self.to_string(),
        };

        let body = match &self {
            Self::BulkEdit(BulkEditError::QuotaExceeded { usage, limit }) => {
                json!({ "error": message, "usage": usage, "limit": limit })
            }
            _ => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}
