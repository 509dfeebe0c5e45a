//! Automation rules.
//!
//! On every product update the engine re-evaluates each enabled rule against
//! a fresh snapshot and applies the matching rules' plans through the same
//! executor the wizard uses. Our own update triggers another webhook; since
//! planning suppresses no-ops, that second pass plans nothing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::execute::{BatchExecutor, ExecutionContext, ExecutionReport};
use super::filter::{FilterRule, matches_all};
use super::modification::ModSpec;
use super::plan::plan;
use super::quota::QuotaPolicy;
use crate::error::BulkEditError;
use crate::ports::RuleRegistry;
use crate::types::{ChangeSource, ChangesetId, Product};

/// One automation rule: filters plus modifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomationRule {
    pub id: Uuid,
    pub name: String,
    pub enabled: bool,
    pub filters: Vec<FilterRule>,
    pub modifications: Vec<ModSpec>,
}

/// What happened to one rule for one product update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum RuleOutcome {
    /// The product did not pass the rule's filters.
    NotMatched,
    /// Matched, but every field already had its target value.
    Converged,
    /// Matched and executed.
    Applied {
        changeset_id: Option<ChangesetId>,
        report: ExecutionReport,
    },
    /// Skipped: monthly quota used up.
    QuotaExceeded { usage: u32, limit: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRun {
    pub rule_id: Uuid,
    pub rule_name: String,
    #[serde(flatten)]
    pub outcome: RuleOutcome,
}

/// Evaluates automation rules on product updates.
#[derive(Clone)]
pub struct AutomationEngine {
    executor: Arc<BatchExecutor>,
    rules: Arc<dyn RuleRegistry>,
    quota: QuotaPolicy,
}

impl std::fmt::Debug for AutomationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutomationEngine")
            .field("executor", &self.executor)
            .field("quota", &self.quota)
            .finish_non_exhaustive()
    }
}

impl AutomationEngine {
    #[must_use]
    pub fn new(
        executor: Arc<BatchExecutor>,
        rules: Arc<dyn RuleRegistry>,
        quota: QuotaPolicy,
    ) -> Self {
        Self {
            executor,
            rules,
            quota,
        }
    }

    /// Run every enabled rule for `shop` against a freshly fetched product.
    ///
    /// Rules run in registry order. The snapshot is updated with each rule's
    /// applied changes, so a later rule sees an earlier rule's result. Once
    /// the quota is hit the remaining rules are reported as skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules or usage cannot be read, or a rule names
    /// a field the registry cannot edit.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn on_product_updated(
        &self,
        shop: &str,
        mut product: Product,
    ) -> Result<Vec<RuleRun>, BulkEditError> {
        let rules = self.rules.enabled_rules(shop).await?;
        let registry = self.executor.registry();
        let mut runs = Vec::with_capacity(rules.len());
        let mut blocked: Option<(u32, u32)> = None;

        for rule in rules.into_iter().filter(|r| r.enabled) {
            let outcome = if let Some((usage, limit)) = blocked {
                RuleOutcome::QuotaExceeded { usage, limit }
            } else if !matches_all(&product, &rule.filters, registry) {
                debug!(rule = %rule.name, "Rule did not match");
                RuleOutcome::NotMatched
            } else {
                self.run_rule(shop, &rule, &mut product, &mut blocked).await?
            };
            runs.push(RuleRun {
                rule_id: rule.id,
                rule_name: rule.name,
                outcome,
            });
        }

        Ok(runs)
    }

    async fn run_rule(
        &self,
        shop: &str,
        rule: &AutomationRule,
        product: &mut Product,
        blocked: &mut Option<(u32, u32)>,
    ) -> Result<RuleOutcome, BulkEditError> {
        match self.quota.check(self.executor.usage().as_ref(), shop).await {
            Ok(_) => {}
            Err(BulkEditError::QuotaExceeded { usage, limit }) => {
                *blocked = Some((usage, limit));
                return Ok(RuleOutcome::QuotaExceeded { usage, limit });
            }
            Err(e) => return Err(e),
        }

        let changeset = plan(
            std::iter::once(&*product),
            &rule.modifications,
            self.executor.registry(),
        )?;
        if changeset.is_empty() {
            debug!(rule = %rule.name, "Rule already converged");
            return Ok(RuleOutcome::Converged);
        }

        let ctx = ExecutionContext::new(shop, rule.name.clone(), ChangeSource::Automation);
        let outcome = self.executor.execute(&ctx, &changeset).await;

        for change in &outcome.applied {
            if !product.set_field(change.field, change.sub_entity_id.as_ref(), &change.new_value) {
                warn!(field = %change.field, "Applied change could not be mirrored onto snapshot");
            }
        }

        info!(
            rule = %rule.name,
            success_count = outcome.report.success_count,
            error_count = outcome.report.error_count,
            "Automation rule applied"
        );

        Ok(RuleOutcome::Applied {
            changeset_id: outcome.changeset_id,
            report: outcome.report,
        })
    }
}
