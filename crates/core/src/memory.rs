//! In-memory collaborators.
//!
//! Backed by `tokio::sync::RwLock`. The catalog supports failure injection
//! per product so partial-failure behaviour can be exercised.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::bulk::{AutomationRule, ProductPatch, VariantPatch};
use crate::error::{CatalogError, StoreError};
use crate::ports::{
    AuditEntry, AuditStore, Catalog, ChangesetRecord, ChangesetSummary, MutationOutcome,
    RuleRegistry, UsageCounter,
};
use crate::types::{ChangesetId, ChangesetStatus, Product, ProductId};

/// One mutation call received by [`InMemoryCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationCall {
    Product(ProductId),
    Variants(ProductId, usize),
}

/// Catalog held in memory.
#[derive(Default)]
pub struct InMemoryCatalog {
    products: RwLock<Vec<Product>>,
    rejecting: RwLock<HashSet<ProductId>>,
    unreachable: RwLock<HashSet<ProductId>>,
    calls: RwLock<Vec<MutationCall>>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: RwLock::new(products),
            ..Self::default()
        }
    }

    /// Every mutation for this product comes back with a user error.
    pub async fn reject_updates_for(&self, id: ProductId) {
        self.rejecting.write().await.insert(id);
    }

    /// Every mutation for this product fails at the transport level.
    pub async fn fail_transport_for(&self, id: ProductId) {
        self.unreachable.write().await.insert(id);
    }

    /// Stop injecting failures.
    pub async fn heal(&self) {
        self.rejecting.write().await.clear();
        self.unreachable.write().await.clear();
    }

    /// Snapshot of every product.
    pub async fn products(&self) -> Vec<Product> {
        self.products.read().await.clone()
    }

    pub async fn product(&self, id: &ProductId) -> Option<Product> {
        self.products.read().await.iter().find(|p| &p.id == id).cloned()
    }

    /// Mutation calls received so far, in order.
    pub async fn calls(&self) -> Vec<MutationCall> {
        self.calls.read().await.clone()
    }

    async fn injected_failure(
        &self,
        id: &ProductId,
    ) -> Result<Option<MutationOutcome>, CatalogError> {
        if self.unreachable.read().await.contains(id) {
            return Err(CatalogError::Unavailable(format!("connection reset updating {id}")));
        }
        if self.rejecting.read().await.contains(id) {
            return Ok(Some(MutationOutcome::rejected(vec![format!(
                "Product {}: update rejected",
                id.numeric_id()
            )])));
        }
        Ok(None)
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    /// `query` is matched case-insensitively against titles.
    async fn fetch_products(&self, query: Option<&str>) -> Result<Vec<Product>, CatalogError> {
        let products = self.products.read().await;
        Ok(match query.map(str::to_lowercase) {
            Some(q) => products
                .iter()
                .filter(|p| p.title.to_lowercase().contains(&q))
                .cloned()
                .collect(),
            None => products.clone(),
        })
    }

    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        Ok(self.product(id).await)
    }

    async fn update_product(&self, patch: &ProductPatch) -> Result<MutationOutcome, CatalogError> {
        self.calls.write().await.push(MutationCall::Product(patch.id.clone()));
        if let Some(outcome) = self.injected_failure(&patch.id).await? {
            return Ok(outcome);
        }

        let mut products = self.products.write().await;
        let Some(product) = products.iter_mut().find(|p| p.id == patch.id) else {
            return Ok(MutationOutcome::rejected(vec!["id: Product does not exist".to_string()]));
        };
        patch.apply_to(product);
        Ok(MutationOutcome::applied())
    }

    async fn update_variants(
        &self,
        product_id: &ProductId,
        patches: &[VariantPatch],
    ) -> Result<MutationOutcome, CatalogError> {
        self.calls
            .write()
            .await
            .push(MutationCall::Variants(product_id.clone(), patches.len()));
        if let Some(outcome) = self.injected_failure(product_id).await? {
            return Ok(outcome);
        }

        let mut products = self.products.write().await;
        let Some(product) = products.iter_mut().find(|p| &p.id == product_id) else {
            return Ok(MutationOutcome::rejected(vec![
                "productId: Product does not exist".to_string(),
            ]));
        };

        let missing: Vec<String> = patches
            .iter()
            .filter(|patch| product.variant(&patch.id).is_none())
            .map(|patch| format!("id: Variant {} does not exist", patch.id.numeric_id()))
            .collect();
        if !missing.is_empty() {
            return Ok(MutationOutcome::rejected(missing));
        }

        for patch in patches {
            if let Some(variant) = product.variants.iter_mut().find(|v| v.id == patch.id) {
                patch.apply_to(variant);
            }
        }
        Ok(MutationOutcome::applied())
    }
}

/// Audit store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    records: RwLock<Vec<ChangesetRecord>>,
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }

    pub async fn records(&self) -> Vec<ChangesetRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn record_changeset(&self, record: &ChangesetRecord) -> Result<(), StoreError> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn append_entries(&self, entries: &[AuditEntry]) -> Result<(), StoreError> {
        self.entries.write().await.extend_from_slice(entries);
        Ok(())
    }

    async fn load_changeset(
        &self,
        shop: &str,
        id: ChangesetId,
    ) -> Result<Option<ChangesetRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.summary.id == id && r.summary.shop == shop)
            .cloned())
    }

    async fn list_changesets(
        &self,
        shop: &str,
        limit: u32,
    ) -> Result<Vec<ChangesetSummary>, StoreError> {
        let records = self.records.read().await;
        let mut summaries: Vec<ChangesetSummary> = records
            .iter()
            .filter(|r| r.summary.shop == shop)
            .map(|r| r.summary.clone())
            .collect();
        summaries.reverse();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(summaries)
    }

    async fn mark_reverted(&self, shop: &str, id: ChangesetId) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        match records
            .iter_mut()
            .find(|r| r.summary.id == id && r.summary.shop == shop)
        {
            Some(record) => {
                record.summary.status = ChangesetStatus::Reverted;
                Ok(())
            }
            None => Err(StoreError::Backend(format!("changeset {id} not found"))),
        }
    }
}

/// Usage counter held in memory. Does not roll over.
#[derive(Debug, Default)]
pub struct InMemoryUsageCounter {
    counts: RwLock<HashMap<String, u32>>,
}

impl InMemoryUsageCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a shop at a given count.
    #[must_use]
    pub fn with_usage(shop: &str, usage: u32) -> Self {
        Self {
            counts: RwLock::new(HashMap::from([(shop.to_string(), usage)])),
        }
    }
}

#[async_trait]
impl UsageCounter for InMemoryUsageCounter {
    async fn current_usage(&self, shop: &str) -> Result<u32, StoreError> {
        Ok(self.counts.read().await.get(shop).copied().unwrap_or(0))
    }

    async fn increment_usage(&self, shop: &str) -> Result<u32, StoreError> {
        let mut counts = self.counts.write().await;
        let count = counts.entry(shop.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        Ok(*count)
    }
}

/// Automation rules held in memory.
#[derive(Debug, Default)]
pub struct InMemoryRuleRegistry {
    rules: RwLock<HashMap<String, Vec<AutomationRule>>>,
}

impl InMemoryRuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_rule(&self, shop: &str, rule: AutomationRule) {
        self.rules
            .write()
            .await
            .entry(shop.to_string())
            .or_default()
            .push(rule);
    }
}

#[async_trait]
impl RuleRegistry for InMemoryRuleRegistry {
    async fn enabled_rules(&self, shop: &str) -> Result<Vec<AutomationRule>, StoreError> {
        Ok(self
            .rules
            .read()
            .await
            .get(shop)
            .map(|rules| rules.iter().filter(|r| r.enabled).cloned().collect())
            .unwrap_or_default())
    }
}
