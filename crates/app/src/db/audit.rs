//! Changeset and audit-entry persistence.

use async_trait::async_trait;
use batchwise_core::bulk::Changeset;
use batchwise_core::ports::{AuditEntry, AuditStore, ChangesetRecord, ChangesetSummary};
use batchwise_core::{ChangesetId, ChangesetStatus, StoreError};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use super::{RepositoryError, count_from_db, count_to_db};

/// Internal row type for changeset summaries.
#[derive(Debug, sqlx::FromRow)]
struct ChangesetSummaryRow {
    id: Uuid,
    shop: String,
    name: String,
    source: String,
    status: String,
    entity_count: i64,
    success_count: i64,
    error_count: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<ChangesetSummaryRow> for ChangesetSummary {
    type Error = RepositoryError;

    fn try_from(row: ChangesetSummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ChangesetId::from_uuid(row.id),
            shop: row.shop,
            name: row.name,
            source: row.source.parse().map_err(RepositoryError::DataCorruption)?,
            status: row.status.parse().map_err(RepositoryError::DataCorruption)?,
            entity_count: count_from_db(row.entity_count, "entity_count")?,
            success_count: count_from_db(row.success_count, "success_count")?,
            error_count: count_from_db(row.error_count, "error_count")?,
            created_at: row.created_at,
        })
    }
}

/// Internal row type for a full changeset.
#[derive(Debug, sqlx::FromRow)]
struct ChangesetRow {
    #[sqlx(flatten)]
    summary: ChangesetSummaryRow,
    changes: Json<Changeset>,
}

/// Audit store over the `batchwise` schema.
#[derive(Debug, Clone)]
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    /// Create a new audit store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_changeset(&self, record: &ChangesetRecord) -> Result<(), RepositoryError> {
        let summary = &record.summary;
        sqlx::query(
            r"
            INSERT INTO batchwise.changesets
                (id, shop, name, source, status, entity_count, success_count, error_count,
                 changes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(summary.id.as_uuid())
        .bind(&summary.shop)
        .bind(&summary.name)
        .bind(summary.source.as_str())
        .bind(summary.status.as_str())
        .bind(count_to_db(summary.entity_count))
        .bind(count_to_db(summary.success_count))
        .bind(count_to_db(summary.error_count))
        .bind(Json(&record.changes))
        .bind(summary.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_entries(&self, entries: &[AuditEntry]) -> Result<(), RepositoryError> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "INSERT INTO batchwise.audit_entries \
             (shop, changeset_id, source, product_id, product_label, variant_id, variant_label, \
              field, old_value, new_value, created_at) ",
        );
        builder.push_values(entries, |mut row, entry| {
            row.push_bind(&entry.shop)
                .push_bind(entry.changeset_id.map(|id| id.as_uuid()))
                .push_bind(entry.source.as_str())
                .push_bind(entry.product_id.as_str())
                .push_bind(&entry.product_label)
                .push_bind(entry.variant_id.as_ref().map(|id| id.as_str().to_string()))
                .push_bind(&entry.variant_label)
                .push_bind(entry.field.as_str())
                .push_bind(&entry.old_value)
                .push_bind(&entry.new_value)
                .push_bind(entry.created_at);
        });
        builder.build().execute(&self.pool).await?;
        Ok(())
    }

    async fn select_changeset(
        &self,
        shop: &str,
        id: ChangesetId,
    ) -> Result<Option<ChangesetRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, ChangesetRow>(
            r"
            SELECT id, shop, name, source, status, entity_count, success_count, error_count,
                   created_at, changes
            FROM batchwise.changesets
            WHERE shop = $1 AND id = $2
            ",
        )
        .bind(shop)
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(ChangesetRecord {
                summary: row.summary.try_into()?,
                changes: row.changes.0,
            })
        })
        .transpose()
    }

    async fn select_summaries(
        &self,
        shop: &str,
        limit: u32,
    ) -> Result<Vec<ChangesetSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, ChangesetSummaryRow>(
            r"
            SELECT id, shop, name, source, status, entity_count, success_count, error_count,
                   created_at
            FROM batchwise.changesets
            WHERE shop = $1
            ORDER BY created_at DESC
            LIMIT $2
            ",
        )
        .bind(shop)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_reverted(&self, shop: &str, id: ChangesetId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE batchwise.changesets
            SET status = $3
            WHERE shop = $1 AND id = $2
            ",
        )
        .bind(shop)
        .bind(id.as_uuid())
        .bind(ChangesetStatus::Reverted.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    #[instrument(
        skip(self, record),
        fields(shop = %record.summary.shop, changeset_id = %record.summary.id)
    )]
    async fn record_changeset(&self, record: &ChangesetRecord) -> Result<(), StoreError> {
        Ok(self.insert_changeset(record).await?)
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn append_entries(&self, entries: &[AuditEntry]) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        Ok(self.insert_entries(entries).await?)
    }

    #[instrument(skip(self))]
    async fn load_changeset(
        &self,
        shop: &str,
        id: ChangesetId,
    ) -> Result<Option<ChangesetRecord>, StoreError> {
        Ok(self.select_changeset(shop, id).await?)
    }

    #[instrument(skip(self))]
    async fn list_changesets(
        &self,
        shop: &str,
        limit: u32,
    ) -> Result<Vec<ChangesetSummary>, StoreError> {
        Ok(self.select_summaries(shop, limit).await?)
    }

    #[instrument(skip(self))]
    async fn mark_reverted(&self, shop: &str, id: ChangesetId) -> Result<(), StoreError> {
        Ok(self.update_reverted(shop, id).await?)
    }
}
