//! Shopify Admin API client (HIGH PRIVILEGE).
//!
//! # Security
//!
//! **This module holds the Admin API access token.** The token can rewrite
//! every product in the store, so it never leaves [`AdminClient`] and is
//! redacted from `Debug` output.
//!
//! # Architecture
//!
//! - Requests and responses use the `graphql_client` envelope types
//! - Queries are plain strings in [`queries`]; no schema is needed at build time
//! - [`AdminClient`] implements the engine's [`batchwise_core::ports::Catalog`]
//!   port, so the engine never sees GraphQL

mod catalog;
mod client;
mod conversions;
pub mod queries;

pub use client::AdminClient;

use batchwise_core::CatalogError;
use thiserror::Error;

/// Errors that can occur when interacting with Shopify Admin API.
#[derive(Debug, Error)]
pub enum AdminShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User error from mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),
}

/// A GraphQL error returned by the Shopify Admin API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

impl From<graphql_client::Error> for GraphQLError {
    fn from(error: graphql_client::Error) -> Self {
        Self {
            message: error.message,
            locations: error
                .locations
                .unwrap_or_default()
                .into_iter()
                .map(|l| GraphQLErrorLocation {
                    line: i64::from(l.line),
                    column: i64::from(l.column),
                })
                .collect(),
            path: error
                .path
                .unwrap_or_default()
                .into_iter()
                .map(|fragment| match fragment {
                    graphql_client::PathFragment::Key(key) => serde_json::Value::String(key),
                    graphql_client::PathFragment::Index(index) => serde_json::Value::from(index),
                })
                .collect(),
        }
    }
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Throttling and auth failures are deterministic for the current request;
/// everything else is treated as transport trouble.
impl From<AdminShopifyError> for CatalogError {
    fn from(error: AdminShopifyError) -> Self {
        match error {
            AdminShopifyError::RateLimited(_)
            | AdminShopifyError::Unauthorized(_)
            | AdminShopifyError::UserError(_)
            | AdminShopifyError::NotFound(_) => Self::Rejected(error.to_string()),
            AdminShopifyError::Http(_)
            | AdminShopifyError::GraphQL(_)
            | AdminShopifyError::Parse(_) => Self::Unavailable(error.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_shopify_error_display() {
        let err = AdminShopifyError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");
    }

    #[test]
    fn test_graphql_error_formatting() {
        let errors = vec![
            GraphQLError {
                message: "Field not found".to_string(),
                locations: vec![],
                path: vec![],
            },
            GraphQLError {
                message: "Invalid ID".to_string(),
                locations: vec![],
                path: vec![],
            },
        ];
        let err = AdminShopifyError::GraphQL(errors);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: Field not found; Invalid ID"
        );
    }

    #[test]
    fn test_rate_limited_maps_to_rejected() {
        let err: CatalogError = AdminShopifyError::RateLimited(2).into();
        assert!(matches!(err, CatalogError::Rejected(ref m) if m.contains("retry after 2")));
    }

    #[test]
    fn test_graphql_failure_maps_to_unavailable() {
        let err: CatalogError = AdminShopifyError::GraphQL(vec![GraphQLError {
            message: "Internal error".to_string(),
            locations: vec![],
            path: vec![],
        }])
        .into();
        assert!(matches!(err, CatalogError::Unavailable(_)));
    }

    #[test]
    fn test_graphql_client_error_conversion() {
        let raw: graphql_client::Error = serde_json::from_value(serde_json::json!({
            "message": "Throttled",
            "locations": [{"line": 2, "column": 5}],
            "path": ["products", 0]
        }))
        .unwrap();
        let converted = GraphQLError::from(raw);
        assert_eq!(converted.message, "Throttled");
        assert_eq!(converted.locations.len(), 1);
        assert_eq!(converted.path, vec![serde_json::json!("products"), serde_json::json!(0)]);
    }
}
