//! Monthly edit counter.
//!
//! One row per `(shop, month)`. The month key is derived here in UTC, so a
//! new month starts at zero without a reset job.

use async_trait::async_trait;
use batchwise_core::StoreError;
use batchwise_core::ports::UsageCounter;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use super::RepositoryError;

/// Usage counter backed by `batchwise.monthly_usage`.
#[derive(Debug, Clone)]
pub struct PgUsageCounter {
    pool: PgPool,
}

/// `YYYY-MM` key for the month containing `at`.
fn month_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

fn usage_from_db(count: i32) -> Result<u32, RepositoryError> {
    u32::try_from(count)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative usage count: {count}")))
}

impl PgUsageCounter {
    /// Create a new usage counter.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn select(&self, shop: &str, month: &str) -> Result<u32, RepositoryError> {
        let count: Option<i32> = sqlx::query_scalar(
            r"
            SELECT count FROM batchwise.monthly_usage
            WHERE shop = $1 AND month = $2
            ",
        )
        .bind(shop)
        .bind(month)
        .fetch_optional(&self.pool)
        .await?;

        count.map_or(Ok(0), usage_from_db)
    }

    async fn upsert_increment(&self, shop: &str, month: &str) -> Result<u32, RepositoryError> {
        let count: i32 = sqlx::query_scalar(
            r"
            INSERT INTO batchwise.monthly_usage (shop, month, count)
            VALUES ($1, $2, 1)
            ON CONFLICT (shop, month)
            DO UPDATE SET count = batchwise.monthly_usage.count + 1
            RETURNING count
            ",
        )
        .bind(shop)
        .bind(month)
        .fetch_one(&self.pool)
        .await?;

        usage_from_db(count)
    }
}

#[async_trait]
impl UsageCounter for PgUsageCounter {
    #[instrument(skip(self))]
    async fn current_usage(&self, shop: &str) -> Result<u32, StoreError> {
        Ok(self.select(shop, &month_key(Utc::now())).await?)
    }

    #[instrument(skip(self))]
    async fn increment_usage(&self, shop: &str) -> Result<u32, StoreError> {
        Ok(self.upsert_increment(shop, &month_key(Utc::now())).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_month_key_is_utc_calendar_month() {
        let last_second = Utc.with_ymd_and_hms(2026, 1, 31, 23, 59, 59).unwrap();
        let first_second = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(month_key(last_second), "2026-01");
        assert_eq!(month_key(first_second), "2026-02");
    }

    #[test]
    fn test_negative_count_is_rejected() {
        assert_eq!(usage_from_db(12).unwrap(), 12);
        assert!(usage_from_db(-1).is_err());
    }
}
