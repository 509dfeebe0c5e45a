//! Collaborator ports.
//!
//! The engine reaches the outside world only through these traits. The app
//! crate implements them against Shopify and PostgreSQL; [`crate::memory`]
//! implements them in memory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bulk::{AutomationRule, Change, Changeset, ProductPatch, VariantPatch};
use crate::error::{CatalogError, StoreError};
use crate::registry::Field;
use crate::types::{ChangeSource, ChangesetId, ChangesetStatus, Product, ProductId, VariantId};

/// Result of one catalog mutation.
///
/// Non-empty `user_errors` means the catalog rejected the request and
/// applied none of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationOutcome {
    pub user_errors: Vec<String>,
}

impl MutationOutcome {
    #[must_use]
    pub const fn applied() -> Self {
        Self {
            user_errors: Vec::new(),
        }
    }

    #[must_use]
    pub const fn rejected(user_errors: Vec<String>) -> Self {
        Self { user_errors }
    }

    #[must_use]
    pub fn is_applied(&self) -> bool {
        self.user_errors.is_empty()
    }
}

/// The external product catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Fetch every product matching an optional catalog search query,
    /// fully materialised (pagination is the implementation's concern).
    async fn fetch_products(&self, query: Option<&str>) -> Result<Vec<Product>, CatalogError>;

    /// Fetch one product, or `None` if it no longer exists.
    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError>;

    /// Apply product-level fields in one request.
    async fn update_product(&self, patch: &ProductPatch) -> Result<MutationOutcome, CatalogError>;

    /// Apply variant-level fields for several variants of one product in
    /// one request.
    async fn update_variants(
        &self,
        product_id: &ProductId,
        patches: &[VariantPatch],
    ) -> Result<MutationOutcome, CatalogError>;
}

/// Summary of a persisted changeset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangesetSummary {
    pub id: ChangesetId,
    pub shop: String,
    pub name: String,
    pub source: ChangeSource,
    pub status: ChangesetStatus,
    pub entity_count: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub created_at: DateTime<Utc>,
}

/// A persisted changeset with its (capped) changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangesetRecord {
    #[serde(flatten)]
    pub summary: ChangesetSummary,
    pub changes: Changeset,
}

/// One applied change, for historical reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub shop: String,
    pub changeset_id: Option<ChangesetId>,
    pub source: ChangeSource,
    pub product_id: ProductId,
    pub product_label: String,
    pub variant_id: Option<VariantId>,
    pub variant_label: Option<String>,
    pub field: Field,
    pub old_value: String,
    pub new_value: String,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    #[must_use]
    pub fn from_change(
        shop: &str,
        changeset_id: Option<ChangesetId>,
        source: ChangeSource,
        change: &Change,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            shop: shop.to_string(),
            changeset_id,
            source,
            product_id: change.entity_id.clone(),
            product_label: change.entity_label.clone(),
            variant_id: change.sub_entity_id.clone(),
            variant_label: change.sub_entity_label.clone(),
            field: change.field,
            old_value: change.old_value.clone(),
            new_value: change.new_value.clone(),
            created_at,
        }
    }
}

/// Append-only audit trail.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn record_changeset(&self, record: &ChangesetRecord) -> Result<(), StoreError>;

    async fn append_entries(&self, entries: &[AuditEntry]) -> Result<(), StoreError>;

    async fn load_changeset(
        &self,
        shop: &str,
        id: ChangesetId,
    ) -> Result<Option<ChangesetRecord>, StoreError>;

    /// Most recent first.
    async fn list_changesets(
        &self,
        shop: &str,
        limit: u32,
    ) -> Result<Vec<ChangesetSummary>, StoreError>;

    async fn mark_reverted(&self, shop: &str, id: ChangesetId) -> Result<(), StoreError>;
}

/// Monthly edit counter. Month rollover is the implementation's concern.
#[async_trait]
pub trait UsageCounter: Send + Sync {
    async fn current_usage(&self, shop: &str) -> Result<u32, StoreError>;

    /// Atomically add one; returns the new count.
    async fn increment_usage(&self, shop: &str) -> Result<u32, StoreError>;
}

/// Source of automation rules.
#[async_trait]
pub trait RuleRegistry: Send + Sync {
    /// Enabled rules for a shop, in evaluation order.
    async fn enabled_rules(&self, shop: &str) -> Result<Vec<AutomationRule>, StoreError>;
}
