//! `PostgreSQL` adapters for the engine's storage ports.
//!
//! # Schema: `batchwise`
//!
//! ## Tables
//!
//! - `changesets` - One row per executed changeset; capped changes as JSONB
//! - `audit_entries` - One row per applied or reverted change
//! - `monthly_usage` - Edit counter keyed by `(shop, month)`
//! - `automation_rules` - Filters and modifications as JSONB, ordered by `position`
//!
//! Schema management lives outside this service.

pub mod audit;
pub mod rules;
pub mod usage;

use std::time::Duration;

use batchwise_core::StoreError;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use audit::PgAuditStore;
pub use rules::PgRuleRegistry;
pub use usage::PgUsageCounter;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,
}

impl From<RepositoryError> for StoreError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DataCorruption(msg) => Self::DataCorruption(msg),
            other => Self::Backend(other.to_string()),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Convert a stored count column into the port's counter type.
fn count_from_db(value: i64, column: &str) -> Result<usize, RepositoryError> {
    usize::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {column}: {value}")))
}

/// Convert a count into its column type.
fn count_to_db(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_corruption_is_preserved() {
        let err: StoreError = RepositoryError::DataCorruption("bad json".to_string()).into();
        assert_eq!(err, StoreError::DataCorruption("bad json".to_string()));
    }

    #[test]
    fn test_not_found_becomes_backend() {
        let err: StoreError = RepositoryError::NotFound.into();
        assert_eq!(err, StoreError::Backend("not found".to_string()));
    }

    #[test]
    fn test_negative_count_is_corruption() {
        assert_eq!(count_from_db(3, "entity_count").ok(), Some(3));
        assert!(matches!(
            count_from_db(-1, "entity_count"),
            Err(RepositoryError::DataCorruption(_))
        ));
        assert_eq!(count_to_db(7), 7);
    }
}
