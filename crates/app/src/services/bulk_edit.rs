//! Bulk-edit wizard orchestration.
//!
//! Flow for an apply:
//! 1. Check the monthly quota (before any catalog read)
//! 2. Validate filters and modifications against the field registry
//! 3. Fetch the catalog and filter it
//! 4. Plan, then execute through the shared executor

use batchwise_core::bulk::{
    Changeset, ExecutionContext, ExecutionReport, FilterRule, ModSpec, ModSpecInput, RevertScope,
    SkippedField, filter_products, plan_detailed, validate_all,
};
use batchwise_core::ports::{ChangesetRecord, ChangesetSummary};
use batchwise_core::{ChangeSource, ChangesetId, Product};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::state::AppState;

/// Most changesets returned by one listing.
pub const MAX_LIST_LIMIT: u32 = 100;

/// Filters plus modifications, as submitted by the wizard.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEditRequest {
    #[serde(default)]
    pub filters: Vec<FilterRule>,
    pub modifications: Vec<ModSpecInput>,
    /// Optional catalog search query to narrow the fetch.
    #[serde(default)]
    pub query: Option<String>,
    /// Display name for the changeset.
    #[serde(default)]
    pub name: Option<String>,
}

/// Dry-run result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub matched_products: usize,
    pub entity_count: usize,
    pub changes: Changeset,
    pub skipped: Vec<SkippedField>,
}

/// Result of an apply.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResponse {
    pub changeset_id: Option<ChangesetId>,
    pub matched_products: usize,
    pub planned_changes: usize,
    pub report: ExecutionReport,
}

/// Current monthly usage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub usage: u32,
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
}

/// Validated form of a [`BulkEditRequest`].
struct ValidatedRequest {
    filters: Vec<FilterRule>,
    specs: Vec<ModSpec>,
}

/// Bulk-edit operations for the configured shop.
pub struct BulkEditService<'a> {
    state: &'a AppState,
}

impl<'a> BulkEditService<'a> {
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn validate(&self, request: &BulkEditRequest) -> Result<ValidatedRequest, AppError> {
        if request.modifications.is_empty() {
            return Err(AppError::BadRequest("at least one modification is required".to_string()));
        }
        let registry = self.state.registry();
        validate_all(&request.filters, registry)?;
        let specs = ModSpec::from_inputs(&request.modifications, registry)?;
        Ok(ValidatedRequest {
            filters: request.filters.clone(),
            specs,
        })
    }

    async fn matching_products(
        &self,
        request: &BulkEditRequest,
        filters: &[FilterRule],
    ) -> Result<Vec<Product>, AppError> {
        let products = self
            .state
            .catalog()
            .fetch_products(request.query.as_deref())
            .await?;
        Ok(filter_products(&products, filters, self.state.registry())
            .into_iter()
            .cloned()
            .collect())
    }

    /// Plan without mutating anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the request does not validate or the catalog
    /// cannot be read.
    #[instrument(skip(self, request), fields(shop = %self.state.shop()))]
    pub async fn preview(&self, request: &BulkEditRequest) -> Result<PreviewResponse, AppError> {
        let validated = self.validate(request)?;
        let products = self.matching_products(request, &validated.filters).await?;
        let outcome = plan_detailed(&products, &validated.specs, self.state.registry())?;

        Ok(PreviewResponse {
            matched_products: products.len(),
            entity_count: outcome.changeset.entity_count(),
            changes: outcome.changeset,
            skipped: outcome.skipped,
        })
    }

    /// Plan and execute.
    ///
    /// # Errors
    ///
    /// Returns `QuotaExceeded` (before any catalog read) when
    /// the shop is at its limit, or an error if the request does not validate
    /// or the catalog cannot be read. Per-product failures are reported in
    /// the response, not returned.
    #[instrument(skip(self, request), fields(shop = %self.state.shop()))]
    pub async fn apply(&self, request: &BulkEditRequest) -> Result<ApplyResponse, AppError> {
        let shop = self.state.shop();
        let executor = self.state.executor();
        self.state
            .settings()
            .quota
            .check(executor.usage().as_ref(), shop)
            .await?;

        let validated = self.validate(request)?;
        let products = self.matching_products(request, &validated.filters).await?;
        let outcome = plan_detailed(&products, &validated.specs, self.state.registry())?;
        let changeset = outcome.changeset;

        if changeset.is_empty() {
            info!(matched = products.len(), "Nothing to change");
            return Ok(ApplyResponse {
                changeset_id: None,
                matched_products: products.len(),
                planned_changes: 0,
                report: ExecutionReport::default(),
            });
        }

        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(default_name, str::to_string);
        let ctx = ExecutionContext::new(shop, name, ChangeSource::BulkEdit);
        let executed = executor.execute(&ctx, &changeset).await;

        Ok(ApplyResponse {
            changeset_id: executed.changeset_id,
            matched_products: products.len(),
            planned_changes: changeset.len(),
            report: executed.report,
        })
    }

    /// Recent changesets, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the audit store cannot be read.
    #[instrument(skip(self))]
    pub async fn list(&self, limit: u32) -> Result<Vec<ChangesetSummary>, AppError> {
        let limit = limit.clamp(1, MAX_LIST_LIMIT);
        Ok(self
            .state
            .executor()
            .audit()
            .list_changesets(self.state.shop(), limit)
            .await?)
    }

    /// One changeset with its recorded changes.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if there is no such changeset for this
    /// shop.
    #[instrument(skip(self))]
    pub async fn get(&self, id: ChangesetId) -> Result<ChangesetRecord, AppError> {
        self.state
            .executor()
            .audit()
            .load_changeset(self.state.shop(), id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("changeset {id}")))
    }

    /// Undo a whole changeset or one of its changes.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown changeset, and
    /// `AlreadyReverted` or `ChangeNotFound` from the executor.
    #[instrument(skip(self))]
    pub async fn revert(
        &self,
        id: ChangesetId,
        scope: RevertScope,
    ) -> Result<ExecutionReport, AppError> {
        let record = self.get(id).await?;
        let report = self.state.executor().revert(&record, scope).await?;
        Ok(report)
    }

    /// Usage against the monthly limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the usage counter cannot be read.
    #[instrument(skip(self))]
    pub async fn usage(&self) -> Result<UsageResponse, AppError> {
        let usage = self
            .state
            .executor()
            .usage()
            .current_usage(self.state.shop())
            .await?;
        let limit = self.state.settings().quota.monthly_limit;
        Ok(UsageResponse {
            usage,
            limit,
            remaining: limit.map(|l| l.saturating_sub(usage)),
        })
    }
}

fn default_name() -> String {
    format!("Bulk edit {}", Utc::now().format("%Y-%m-%d %H:%M UTC"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserializes_wire_shape() {
        let request: BulkEditRequest = serde_json::from_value(serde_json::json!({
            "filters": [{"field": "vendor", "operator": "equals", "value": "Acme"}],
            "modifications": [{
                "field": "price",
                "type": "increase_percent",
                "value": "10",
                "rounding": "round_99"
            }]
        }))
        .unwrap();
        assert_eq!(request.filters.len(), 1);
        assert_eq!(request.modifications.len(), 1);
        assert!(request.name.is_none());
    }

    #[test]
    fn test_default_name_is_timestamped() {
        assert!(default_name().starts_with("Bulk edit "));
    }
}
