//! Application state shared across handlers.

use std::sync::Arc;

use batchwise_core::FieldRegistry;
use batchwise_core::bulk::{AutomationEngine, BatchExecutor, QuotaPolicy};
use batchwise_core::ports::{AuditStore, Catalog, RuleRegistry, UsageCounter};
use secrecy::SecretString;
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::db::{PgAuditStore, PgRuleRegistry, PgUsageCounter};

/// The collaborators behind the engine.
#[derive(Clone)]
pub struct Ports {
    pub catalog: Arc<dyn Catalog>,
    pub audit: Arc<dyn AuditStore>,
    pub usage: Arc<dyn UsageCounter>,
    pub rules: Arc<dyn RuleRegistry>,
}

impl Ports {
    /// `PostgreSQL`-backed storage around the given catalog.
    #[must_use]
    pub fn postgres(
        pool: &PgPool,
        catalog: Arc<dyn Catalog>,
        registry: Arc<FieldRegistry>,
    ) -> Self {
        Self {
            catalog,
            audit: Arc::new(PgAuditStore::new(pool.clone())),
            usage: Arc::new(PgUsageCounter::new(pool.clone())),
            rules: Arc::new(PgRuleRegistry::new(pool.clone(), registry)),
        }
    }
}

/// Per-deployment settings the handlers need.
#[derive(Clone)]
pub struct Settings {
    /// Shop domain the wizard edits.
    pub shop: String,
    /// Secret for webhook HMAC verification.
    pub webhook_secret: SecretString,
    pub quota: QuotaPolicy,
    pub audit_cap: usize,
}

impl Settings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            shop: config.shopify.store.clone(),
            webhook_secret: config.shopify.webhook_secret.clone(),
            quota: QuotaPolicy {
                monthly_limit: config.bulk_edit.monthly_edit_limit,
            },
            audit_cap: config.bulk_edit.audit_cap,
        }
    }
}

/// Application state shared across all handlers.
///
/// Cheap to clone; handlers receive it through axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    settings: Settings,
    pool: Option<PgPool>,
    registry: Arc<FieldRegistry>,
    catalog: Arc<dyn Catalog>,
    executor: Arc<BatchExecutor>,
    automation: AutomationEngine,
}

impl AppState {
    /// Wire the engine together.
    ///
    /// `pool` is only used for the readiness probe; without it the service
    /// reports ready as long as it is up.
    #[must_use]
    pub fn new(
        settings: Settings,
        registry: Arc<FieldRegistry>,
        ports: Ports,
        pool: Option<PgPool>,
    ) -> Self {
        let executor = Arc::new(
            BatchExecutor::new(
                Arc::clone(&ports.catalog),
                ports.audit,
                ports.usage,
                Arc::clone(&registry),
            )
            .with_audit_cap(settings.audit_cap),
        );
        let automation = AutomationEngine::new(Arc::clone(&executor), ports.rules, settings.quota);

        Self {
            inner: Arc::new(AppStateInner {
                settings,
                pool,
                registry,
                catalog: ports.catalog,
                executor,
                automation,
            }),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Shop domain the wizard edits.
    #[must_use]
    pub fn shop(&self) -> &str {
        &self.inner.settings.shop
    }

    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn registry(&self) -> &FieldRegistry {
        &self.inner.registry
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn Catalog {
        self.inner.catalog.as_ref()
    }

    #[must_use]
    pub fn executor(&self) -> &BatchExecutor {
        &self.inner.executor
    }

    #[must_use]
    pub fn automation(&self) -> &AutomationEngine {
        &self.inner.automation
    }
}
