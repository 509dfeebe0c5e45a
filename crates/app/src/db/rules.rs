//! Automation rule storage.
//!
//! Rules are stored in their wire shape and validated against the field
//! registry on every read. A rule that no longer validates is skipped with a
//! warning rather than failing the whole webhook.

use std::sync::Arc;

use async_trait::async_trait;
use batchwise_core::bulk::{AutomationRule, FilterRule, ModSpec, ModSpecInput, validate_all};
use batchwise_core::ports::RuleRegistry;
use batchwise_core::{BulkEditError, FieldRegistry, StoreError};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::{instrument, warn};
use uuid::Uuid;

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct RuleRow {
    id: Uuid,
    name: String,
    enabled: bool,
    filters: Json<Vec<FilterRule>>,
    modifications: Json<Vec<ModSpecInput>>,
}

impl RuleRow {
    fn into_rule(self, registry: &FieldRegistry) -> Result<AutomationRule, BulkEditError> {
        let filters = self.filters.0;
        validate_all(&filters, registry)?;
        let modifications = ModSpec::from_inputs(&self.modifications.0, registry)?;

        Ok(AutomationRule {
            id: self.id,
            name: self.name,
            enabled: self.enabled,
            filters,
            modifications,
        })
    }
}

/// Rule registry backed by `batchwise.automation_rules`.
#[derive(Debug, Clone)]
pub struct PgRuleRegistry {
    pool: PgPool,
    registry: Arc<FieldRegistry>,
}

impl PgRuleRegistry {
    /// Create a new rule registry.
    #[must_use]
    pub const fn new(pool: PgPool, registry: Arc<FieldRegistry>) -> Self {
        Self { pool, registry }
    }

    async fn select_enabled(&self, shop: &str) -> Result<Vec<RuleRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, RuleRow>(
            r"
            SELECT id, name, enabled, filters, modifications
            FROM batchwise.automation_rules
            WHERE shop = $1 AND enabled
            ORDER BY position, created_at
            ",
        )
        .bind(shop)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl RuleRegistry for PgRuleRegistry {
    #[instrument(skip(self))]
    async fn enabled_rules(&self, shop: &str) -> Result<Vec<AutomationRule>, StoreError> {
        let rows = self.select_enabled(shop).await?;
        let rules = rows
            .into_iter()
            .filter_map(|row| {
                let (id, name) = (row.id, row.name.clone());
                row.into_rule(&self.registry)
                    .map_err(|e| {
                        warn!(
                            rule_id = %id,
                            rule = %name,
                            error = %e,
                            "Skipping invalid automation rule"
                        );
                    })
                    .ok()
            })
            .collect();
        Ok(rules)
    }
}
