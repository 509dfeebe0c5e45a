//! Integration tests for Batchwise.
//!
//! Everything runs in-process against the in-memory ports from
//! `batchwise_core::memory`, so no database or Shopify store is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p batchwise-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `engine_properties` - Filter, transform and planning properties
//! - `executor` - Failure isolation, audit trail, quota and revert
//! - `automation` - Rule evaluation on product updates
//! - `http_api` - The JSON API and webhook through the router

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use batchwise_app::state::{AppState, Ports, Settings};
use batchwise_core::bulk::{BatchExecutor, QuotaPolicy};
use batchwise_core::memory::{
    InMemoryAuditStore, InMemoryCatalog, InMemoryRuleRegistry, InMemoryUsageCounter,
};
use batchwise_core::{FieldRegistry, Product, ProductId, ProductStatus, Variant, VariantId};
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use sha2::Sha256;

/// Shop every fixture belongs to.
pub const SHOP: &str = "batchwise-test.myshopify.com";

/// Webhook secret the test state is configured with.
pub const WEBHOOK_SECRET: &str = "whsec-4f9K2mQx7LpR8tVz";

/// Build a variant with a price and defaults for everything else.
#[must_use]
pub fn variant(id: &str, price: &str) -> Variant {
    Variant {
        id: VariantId::new(id),
        title: format!("Variant {id}"),
        price: price.to_string(),
        compare_at_price: None,
        sku: Some(format!("SKU-{id}")),
        barcode: None,
        weight: None,
        weight_unit: None,
        inventory_quantity: 10,
        taxable: true,
    }
}

/// Build an active product.
#[must_use]
pub fn product(id: &str, title: &str, tags: &[&str], variants: Vec<Variant>) -> Product {
    Product {
        id: ProductId::new(id),
        title: title.to_string(),
        handle: title.to_lowercase().replace(' ', "-"),
        vendor: "Sunbeam Supply".to_string(),
        product_type: "Sunscreen".to_string(),
        status: ProductStatus::Active,
        tags: tags.iter().map(ToString::to_string).collect(),
        template_suffix: None,
        variants,
    }
}

/// A small catalog with three products spanning tags, vendors and prices.
#[must_use]
pub fn sample_catalog() -> Vec<Product> {
    let mut lotion = product(
        "1",
        "Coconut Lotion",
        &["sale", "clearance"],
        vec![variant("11", "19.50"), variant("12", "24.00")],
    );
    lotion.vendor = "Island Goods".to_string();

    let spray = product(
        "2",
        "Mineral Spray",
        &["summer"],
        vec![variant("21", "5.00"), variant("22", "50.00")],
    );

    let mut balm = product("3", "Lip Balm", &["sale"], vec![variant("31", "4.00")]);
    balm.product_type = "Lip Care".to_string();

    vec![lotion, spray, balm]
}

/// In-memory collaborators wired into one engine.
pub struct Harness {
    pub registry: Arc<FieldRegistry>,
    pub catalog: Arc<InMemoryCatalog>,
    pub audit: Arc<InMemoryAuditStore>,
    pub usage: Arc<InMemoryUsageCounter>,
    pub rules: Arc<InMemoryRuleRegistry>,
}

impl Harness {
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        Self::with_usage(products, 0)
    }

    /// Start the shop at a given monthly usage.
    #[must_use]
    pub fn with_usage(products: Vec<Product>, usage: u32) -> Self {
        Self {
            registry: Arc::new(FieldRegistry::standard()),
            catalog: Arc::new(InMemoryCatalog::new(products)),
            audit: Arc::new(InMemoryAuditStore::new()),
            usage: Arc::new(InMemoryUsageCounter::with_usage(SHOP, usage)),
            rules: Arc::new(InMemoryRuleRegistry::new()),
        }
    }

    #[must_use]
    pub fn executor(&self) -> BatchExecutor {
        BatchExecutor::new(
            self.catalog.clone(),
            self.audit.clone(),
            self.usage.clone(),
            Arc::clone(&self.registry),
        )
    }

    #[must_use]
    pub fn ports(&self) -> Ports {
        Ports {
            catalog: self.catalog.clone(),
            audit: self.audit.clone(),
            usage: self.usage.clone(),
            rules: self.rules.clone(),
        }
    }

    /// Application state over these collaborators, without a database pool.
    #[must_use]
    pub fn state(&self, quota: QuotaPolicy) -> AppState {
        let settings = Settings {
            shop: SHOP.to_string(),
            webhook_secret: SecretString::from(WEBHOOK_SECRET.to_string()),
            quota,
            audit_cap: 50,
        };
        AppState::new(settings, Arc::clone(&self.registry), self.ports(), None)
    }

    /// Current catalog copy of a product.
    pub async fn product(&self, id: &str) -> Option<Product> {
        self.catalog.product(&ProductId::new(id)).await
    }
}

/// Sign a webhook body the way Shopify does.
#[must_use]
pub fn sign_webhook(body: &[u8]) -> String {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()) else {
        return String::new();
    };
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}
