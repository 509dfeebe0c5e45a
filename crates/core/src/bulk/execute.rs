//! Batch executor.
//!
//! Applies a changeset against the catalog one product at a time. Product
//! fields go out as one product update; variant fields go out as one bulk
//! variant update per product. A failed request counts every change it
//! carried as an error and processing moves on to the next product.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use super::plan::{Change, Changeset};
use crate::ports::{
    AuditEntry, AuditStore, Catalog, ChangesetRecord, ChangesetSummary, MutationOutcome,
    UsageCounter,
};
use crate::registry::{Field, FieldLevel, FieldRegistry};
use crate::types::product::split_tags;
use crate::types::{
    ChangeSource, ChangesetId, ChangesetStatus, Product, ProductId, ProductStatus, Variant,
    VariantId,
};

/// Default number of changes kept on a persisted changeset.
pub const DEFAULT_AUDIT_CAP: usize = 50;

/// Product-level fields to write in one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub id: ProductId,
    pub title: Option<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub status: Option<ProductStatus>,
    pub tags: Option<Vec<String>>,
    /// `Some("")` clears the template suffix.
    pub template_suffix: Option<String>,
}

impl ProductPatch {
    #[must_use]
    pub const fn new(id: ProductId) -> Self {
        Self {
            id,
            title: None,
            vendor: None,
            product_type: None,
            status: None,
            tags: None,
            template_suffix: None,
        }
    }

    /// Set one field from its string form. Returns `false` if the field is
    /// not product-level or the value does not parse.
    pub fn apply(&mut self, field: Field, value: &str) -> bool {
        match field {
            Field::Title => self.title = Some(value.to_string()),
            Field::Vendor => self.vendor = Some(value.to_string()),
            Field::ProductType => self.product_type = Some(value.to_string()),
            Field::TemplateSuffix => self.template_suffix = Some(value.to_string()),
            Field::Tags => self.tags = Some(split_tags(value)),
            Field::Status => match value.parse() {
                Ok(status) => self.status = Some(status),
                Err(_) => return false,
            },
            _ => return false,
        }
        true
    }

    /// Write the patch into a snapshot.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(title) = &self.title {
            product.title.clone_from(title);
        }
        if let Some(vendor) = &self.vendor {
            product.vendor.clone_from(vendor);
        }
        if let Some(product_type) = &self.product_type {
            product.product_type.clone_from(product_type);
        }
        if let Some(status) = self.status {
            product.status = status;
        }
        if let Some(tags) = &self.tags {
            product.tags.clone_from(tags);
        }
        if let Some(suffix) = &self.template_suffix {
            product.template_suffix = (!suffix.is_empty()).then(|| suffix.clone());
        }
    }
}

/// Variant-level fields for one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantPatch {
    pub id: VariantId,
    pub price: Option<String>,
    /// `Some("")` clears the compare-at price.
    pub compare_at_price: Option<String>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub weight: Option<Decimal>,
    /// Unit `weight` is expressed in. `None` leaves the choice to the catalog.
    pub weight_unit: Option<String>,
    pub taxable: Option<bool>,
}

impl VariantPatch {
    #[must_use]
    pub const fn new(id: VariantId) -> Self {
        Self {
            id,
            price: None,
            compare_at_price: None,
            sku: None,
            barcode: None,
            weight: None,
            weight_unit: None,
            taxable: None,
        }
    }

    /// Set the field a change targets, carrying its weight unit along.
    pub fn apply_change(&mut self, change: &Change) -> bool {
        if !self.apply(change.field, &change.new_value) {
            return false;
        }
        if change.field == Field::Weight {
            self.weight_unit.clone_from(&change.weight_unit);
        }
        true
    }

    /// Set one field from its string form. Returns `false` if the field is
    /// not variant-level or the value does not parse.
    pub fn apply(&mut self, field: Field, value: &str) -> bool {
        match field {
            Field::Price => self.price = Some(value.to_string()),
            Field::CompareAtPrice => self.compare_at_price = Some(value.to_string()),
            Field::Sku => self.sku = Some(value.to_string()),
            Field::Barcode => self.barcode = Some(value.to_string()),
            Field::Weight => match value.trim().parse::<Decimal>() {
                Ok(weight) => self.weight = Some(weight),
                Err(_) => return false,
            },
            Field::Taxable => match value.trim() {
                "true" => self.taxable = Some(true),
                "false" => self.taxable = Some(false),
                _ => return false,
            },
            _ => return false,
        }
        true
    }

    /// Write the patch into a snapshot.
    pub fn apply_to(&self, variant: &mut Variant) {
        if let Some(price) = &self.price {
            variant.price.clone_from(price);
        }
        if let Some(compare_at) = &self.compare_at_price {
            variant.compare_at_price = (!compare_at.is_empty()).then(|| compare_at.clone());
        }
        if let Some(sku) = &self.sku {
            variant.sku = Some(sku.clone());
        }
        if let Some(barcode) = &self.barcode {
            variant.barcode = Some(barcode.clone());
        }
        if let Some(weight) = self.weight {
            variant.weight = Some(weight);
        }
        if let Some(unit) = &self.weight_unit {
            variant.weight_unit = Some(unit.clone());
        }
        if let Some(taxable) = self.taxable {
            variant.taxable = taxable;
        }
    }
}

/// Error messages collected for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityErrors {
    pub entity_id: ProductId,
    pub entity_label: String,
    pub messages: Vec<String>,
}

/// Per-invocation summary of what was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub success_count: usize,
    pub error_count: usize,
    pub per_entity_errors: Vec<EntityErrors>,
    pub total_entities_processed: usize,
}

impl ExecutionReport {
    /// `completed` with zero errors, `failed` with zero successes,
    /// `partial` otherwise.
    #[must_use]
    pub const fn status(&self) -> ChangesetStatus {
        if self.error_count == 0 {
            ChangesetStatus::Completed
        } else if self.success_count == 0 {
            ChangesetStatus::Failed
        } else {
            ChangesetStatus::Partial
        }
    }

    /// Whether this invocation applied anything.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.success_count > 0
    }
}

/// Who is executing, and what to call the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    pub shop: String,
    pub name: String,
    pub source: ChangeSource,
}

impl ExecutionContext {
    pub fn new(shop: impl Into<String>, name: impl Into<String>, source: ChangeSource) -> Self {
        Self {
            shop: shop.into(),
            name: name.into(),
            source,
        }
    }
}

/// Result of [`BatchExecutor::execute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    pub report: ExecutionReport,
    /// `None` if the audit record could not be written.
    pub changeset_id: Option<ChangesetId>,
    /// Changes the catalog accepted, in changeset order.
    pub applied: Vec<Change>,
}

/// Applies changesets and keeps the audit trail.
#[derive(Clone)]
pub struct BatchExecutor {
    catalog: Arc<dyn Catalog>,
    audit: Arc<dyn AuditStore>,
    usage: Arc<dyn UsageCounter>,
    registry: Arc<FieldRegistry>,
    audit_cap: usize,
}

impl std::fmt::Debug for BatchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchExecutor")
            .field("audit_cap", &self.audit_cap)
            .finish_non_exhaustive()
    }
}

/// Changes of one product, split by mutation granularity.
struct EntityGroup<'a> {
    id: &'a ProductId,
    label: &'a str,
    product: Vec<&'a Change>,
    variant: Vec<&'a Change>,
    unroutable: Vec<&'a Change>,
}

impl BatchExecutor {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn Catalog>,
        audit: Arc<dyn AuditStore>,
        usage: Arc<dyn UsageCounter>,
        registry: Arc<FieldRegistry>,
    ) -> Self {
        Self {
            catalog,
            audit,
            usage,
            registry,
            audit_cap: DEFAULT_AUDIT_CAP,
        }
    }

    /// Number of changes kept on each persisted changeset.
    #[must_use]
    pub const fn with_audit_cap(mut self, audit_cap: usize) -> Self {
        self.audit_cap = audit_cap;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    #[must_use]
    pub fn audit(&self) -> &Arc<dyn AuditStore> {
        &self.audit
    }

    #[must_use]
    pub fn usage(&self) -> &Arc<dyn UsageCounter> {
        &self.usage
    }

    /// Apply a changeset, persist the audit trail and count usage.
    ///
    /// Never fails: catalog failures are folded into the report, and audit or
    /// usage failures are logged.
    #[instrument(
        skip(self, changeset),
        fields(shop = %ctx.shop, source = %ctx.source, changes = changeset.len())
    )]
    pub async fn execute(
        &self,
        ctx: &ExecutionContext,
        changeset: &Changeset,
    ) -> ExecutionOutcome {
        let (report, applied) = self.apply(changeset).await;
        let id = ChangesetId::generate();
        let now = Utc::now();

        let record = ChangesetRecord {
            summary: ChangesetSummary {
                id,
                shop: ctx.shop.clone(),
                name: ctx.name.clone(),
                source: ctx.source,
                status: report.status(),
                entity_count: changeset.entity_count(),
                success_count: report.success_count,
                error_count: report.error_count,
                created_at: now,
            },
            changes: changeset.truncated(self.audit_cap),
        };

        let changeset_id = match self.audit.record_changeset(&record).await {
            Ok(()) => Some(id),
            Err(e) => {
                error!(error = %e, changeset_id = %id, "Failed to record changeset");
                None
            }
        };

        let entries: Vec<AuditEntry> = applied
            .iter()
            .map(|change| AuditEntry::from_change(&ctx.shop, changeset_id, ctx.source, change, now))
            .collect();
        if !entries.is_empty()
            && let Err(e) = self.audit.append_entries(&entries).await
        {
            error!(error = %e, count = entries.len(), "Failed to append audit entries");
        }

        if report.succeeded()
            && ctx.source != ChangeSource::Revert
            && let Err(e) = self.usage.increment_usage(&ctx.shop).await
        {
            error!(error = %e, "Failed to increment usage");
        }

        info!(
            changeset_id = %id,
            success_count = report.success_count,
            error_count = report.error_count,
            entities = report.total_entities_processed,
            "Changeset executed"
        );

        ExecutionOutcome {
            report,
            changeset_id,
            applied,
        }
    }

    /// Apply a changeset against the catalog without touching the audit
    /// store or usage counter.
    pub(crate) async fn apply(&self, changeset: &Changeset) -> (ExecutionReport, Vec<Change>) {
        let mut report = ExecutionReport::default();
        let mut applied = Vec::new();

        for group in self.group(changeset) {
            let mut messages = Vec::new();

            for change in &group.unroutable {
                messages.push(format!("{} is not an editable field", change.field));
            }
            report.error_count += group.unroutable.len();

            if !group.product.is_empty() {
                let mut patch = ProductPatch::new(group.id.clone());
                let mut sent = Vec::new();
                for change in group.product {
                    if patch.apply(change.field, &change.new_value) {
                        sent.push(change);
                    } else {
                        report.error_count += 1;
                        messages.push(format!(
                            "invalid value for {}: {}",
                            change.field, change.new_value
                        ));
                    }
                }
                if !sent.is_empty() {
                    let result = self.catalog.update_product(&patch).await;
                    tally(result, &sent, &mut report, &mut messages, &mut applied);
                }
            }

            if !group.variant.is_empty() {
                let mut order: Vec<&VariantId> = Vec::new();
                let mut by_variant: HashMap<&VariantId, VariantPatch> = HashMap::new();
                let mut sent = Vec::new();
                for change in group.variant {
                    let Some(variant_id) = &change.sub_entity_id else {
                        report.error_count += 1;
                        messages.push(format!("{} change is missing its variant", change.field));
                        continue;
                    };
                    let patch = by_variant.entry(variant_id).or_insert_with(|| {
                        order.push(variant_id);
                        VariantPatch::new(variant_id.clone())
                    });
                    if patch.apply_change(change) {
                        sent.push(change);
                    } else {
                        report.error_count += 1;
                        messages.push(format!(
                            "invalid value for {}: {}",
                            change.field, change.new_value
                        ));
                    }
                }
                let patches: Vec<VariantPatch> = order
                    .into_iter()
                    .filter(|id| sent.iter().any(|c| c.sub_entity_id.as_ref() == Some(*id)))
                    .filter_map(|id| by_variant.remove(id))
                    .collect();
                if !sent.is_empty() {
                    let result = self.catalog.update_variants(group.id, &patches).await;
                    tally(result, &sent, &mut report, &mut messages, &mut applied);
                }
            }

            if !messages.is_empty() {
                warn!(product_id = %group.id, errors = ?messages, "Product update failed");
                report.per_entity_errors.push(EntityErrors {
                    entity_id: group.id.clone(),
                    entity_label: group.label.to_string(),
                    messages,
                });
            }
            report.total_entities_processed += 1;
        }

        (report, applied)
    }

    /// Group by product in first-seen order, then split by field level.
    fn group<'a>(&self, changeset: &'a Changeset) -> Vec<EntityGroup<'a>> {
        let mut order: Vec<&ProductId> = Vec::new();
        let mut groups: HashMap<&ProductId, EntityGroup<'a>> = HashMap::new();
        for change in changeset {
            let group = groups.entry(&change.entity_id).or_insert_with(|| {
                order.push(&change.entity_id);
                EntityGroup {
                    id: &change.entity_id,
                    label: &change.entity_label,
                    product: Vec::new(),
                    variant: Vec::new(),
                    unroutable: Vec::new(),
                }
            });
            match self.registry.editable(change.field).map(|d| d.level()) {
                Ok(FieldLevel::Product) => group.product.push(change),
                Ok(FieldLevel::Variant) => group.variant.push(change),
                Err(_) => group.unroutable.push(change),
            }
        }
        order.into_iter().filter_map(|id| groups.remove(id)).collect()
    }
}

fn tally(
    result: Result<MutationOutcome, crate::error::CatalogError>,
    sent: &[&Change],
    report: &mut ExecutionReport,
    messages: &mut Vec<String>,
    applied: &mut Vec<Change>,
) {
    match result {
        Ok(outcome) if outcome.is_applied() => {
            report.success_count += sent.len();
            applied.extend(sent.iter().map(|c| (*c).clone()));
        }
        Ok(outcome) => {
            report.error_count += sent.len();
            messages.extend(outcome.user_errors);
        }
        Err(e) => {
            report.error_count += sent.len();
            messages.push(e.to_string());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::bulk::modification::ChangeKind;

    #[test]
    fn test_report_status() {
        let mut report = ExecutionReport::default();
        assert_eq!(report.status(), ChangesetStatus::Completed);
        report.error_count = 2;
        assert_eq!(report.status(), ChangesetStatus::Failed);
        assert!(!report.succeeded());
        report.success_count = 1;
        assert_eq!(report.status(), ChangesetStatus::Partial);
        assert!(report.succeeded());
    }

    #[test]
    fn test_product_patch_rejects_variant_fields() {
        let mut patch = ProductPatch::new(ProductId::new("1"));
        assert!(!patch.apply(Field::Price, "1.00"));
        assert!(!patch.apply(Field::Status, "GONE"));
        assert!(patch.apply(Field::Tags, "a, b, a"));
        assert_eq!(patch.tags, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_variant_patch_parses_typed_fields() {
        let mut patch = VariantPatch::new(VariantId::new("1"));
        assert!(patch.apply(Field::Weight, "1.5"));
        assert!(patch.apply(Field::Taxable, "false"));
        assert!(!patch.apply(Field::Taxable, "maybe"));
        assert!(!patch.apply(Field::Title, "x"));
        assert_eq!(patch.weight, Some(Decimal::new(15, 1)));
        assert_eq!(patch.taxable, Some(false));
    }

    #[test]
    fn test_apply_change_carries_weight_unit_only_for_weight() {
        let change = |field, value: &str| Change {
            entity_id: ProductId::new("1"),
            entity_label: "Kettlebell".to_string(),
            sub_entity_id: Some(VariantId::new("1")),
            sub_entity_label: None,
            field,
            old_value: String::new(),
            new_value: value.to_string(),
            change_kind: ChangeKind::Set,
            weight_unit: Some("KILOGRAMS".to_string()),
        };
        let mut patch = VariantPatch::new(VariantId::new("1"));
        assert!(patch.apply_change(&change(Field::Price, "5.00")));
        assert_eq!(patch.weight_unit, None);
        assert!(patch.apply_change(&change(Field::Weight, "3")));
        assert_eq!(patch.weight_unit.as_deref(), Some("KILOGRAMS"));
        assert!(!patch.apply_change(&change(Field::Weight, "heavy")));
    }

    #[test]
    fn test_patch_clears_optional_fields() {
        let mut variant = Variant {
            id: VariantId::new("1"),
            title: String::new(),
            price: "5.00".to_string(),
            compare_at_price: Some("9.00".to_string()),
            sku: None,
            barcode: None,
            weight: None,
            weight_unit: None,
            inventory_quantity: 0,
            taxable: true,
        };
        let mut patch = VariantPatch::new(variant.id.clone());
        patch.apply(Field::CompareAtPrice, "");
        patch.apply_to(&mut variant);
        assert_eq!(variant.compare_at_price, None);
    }
}
