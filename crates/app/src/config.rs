//! Application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BATCHWISE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `SHOPIFY_STORE` - Shopify store domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_ACCESS_TOKEN` - Admin API access token (HIGH PRIVILEGE)
//! - `SHOPIFY_WEBHOOK_SECRET` - Secret used to sign webhook payloads
//!
//! ## Optional
//! - `BATCHWISE_HOST` - Bind address (default: 127.0.0.1)
//! - `BATCHWISE_PORT` - Listen port (default: 3002)
//! - `SHOPIFY_API_VERSION` - API version (default: 2026-01)
//! - `SHOPIFY_WEIGHT_UNIT` - Weight unit for variants whose own unit is unknown (default: POUNDS)
//! - `BATCHWISE_MONTHLY_EDIT_LIMIT` - Edits per shop per month (default: unlimited)
//! - `BATCHWISE_AUDIT_CAP` - Changes kept per recorded changeset (default: 50)
//! - `BATCHWISE_PAGE_SIZE` - Products per catalog page (default: 250)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 1.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_AUDIT_CAP: usize = 50;
const DEFAULT_PAGE_SIZE: u32 = 250;
/// Shopify caps `first` at 250 per connection page.
const MAX_PAGE_SIZE: u32 = 250;
const WEIGHT_UNITS: &[&str] = &["GRAMS", "KILOGRAMS", "OUNCES", "POUNDS"];

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Shopify Admin API configuration
    pub shopify: ShopifyConfig,
    /// Bulk edit limits
    pub bulk_edit: BulkEditConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Shopify Admin API configuration.
///
/// Implements `Debug` manually to redact the access token and webhook secret.
#[derive(Clone)]
pub struct ShopifyConfig {
    /// Shopify store domain (e.g., your-store.myshopify.com)
    pub store: String,
    /// Shopify API version (e.g., 2026-01)
    pub api_version: String,
    /// Admin API access token (HIGH PRIVILEGE - product write access)
    pub access_token: SecretString,
    /// Webhook signing secret
    pub webhook_secret: SecretString,
    /// Weight unit sent with variant weight updates
    pub weight_unit: String,
}

impl std::fmt::Debug for ShopifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("access_token", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("weight_unit", &self.weight_unit)
            .finish()
    }
}

/// Limits applied to bulk edits and automations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkEditConfig {
    /// Edits allowed per shop per calendar month (`None` = unlimited)
    pub monthly_edit_limit: Option<u32>,
    /// Changes stored per recorded changeset
    pub audit_cap: usize,
    /// Products fetched per catalog page
    pub page_size: u32,
}

impl Default for BulkEditConfig {
    fn default() -> Self {
        Self {
            monthly_edit_limit: None,
            audit_cap: DEFAULT_AUDIT_CAP,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("BATCHWISE_DATABASE_URL")?;
        let host = get_env_or_default("BATCHWISE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("BATCHWISE_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("BATCHWISE_PORT", "3002")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("BATCHWISE_PORT".to_string(), e.to_string()))?;

        let shopify = ShopifyConfig::from_env()?;
        let bulk_edit = BulkEditConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            shopify,
            bulk_edit,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ShopifyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let weight_unit = get_env_or_default("SHOPIFY_WEIGHT_UNIT", "POUNDS").to_uppercase();
        if !WEIGHT_UNITS.contains(&weight_unit.as_str()) {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPIFY_WEIGHT_UNIT".to_string(),
                format!("must be one of {}", WEIGHT_UNITS.join(", ")),
            ));
        }

        Ok(Self {
            store: get_required_env("SHOPIFY_STORE")?,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", "2026-01"),
            access_token: get_validated_secret("SHOPIFY_ACCESS_TOKEN")?,
            webhook_secret: get_validated_secret("SHOPIFY_WEBHOOK_SECRET")?,
            weight_unit,
        })
    }
}

impl BulkEditConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let monthly_edit_limit = get_optional_env("BATCHWISE_MONTHLY_EDIT_LIMIT")
            .map(|v| parse_env::<u32>("BATCHWISE_MONTHLY_EDIT_LIMIT", &v))
            .transpose()?;
        let audit_cap = get_optional_env("BATCHWISE_AUDIT_CAP")
            .map(|v| parse_env::<usize>("BATCHWISE_AUDIT_CAP", &v))
            .transpose()?
            .unwrap_or(DEFAULT_AUDIT_CAP);
        let page_size = get_optional_env("BATCHWISE_PAGE_SIZE")
            .map(|v| parse_env::<u32>("BATCHWISE_PAGE_SIZE", &v))
            .transpose()?
            .unwrap_or(DEFAULT_PAGE_SIZE);

        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidEnvVar(
                "BATCHWISE_PAGE_SIZE".to_string(),
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }

        Ok(Self {
            monthly_edit_limit,
            audit_cap,
            page_size,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-webhook-secret", "SHOPIFY_WEBHOOK_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("shpat_9fK2mQ7xL4vN8rT1bW6zC3hJ5", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_env_reports_key() {
        let err = parse_env::<u32>("BATCHWISE_AUDIT_CAP", "lots").unwrap_err();
        assert!(err.to_string().contains("BATCHWISE_AUDIT_CAP"));
        assert_eq!(parse_env::<u32>("BATCHWISE_AUDIT_CAP", " 25 ").unwrap(), 25);
    }

    #[test]
    fn test_bulk_edit_defaults() {
        let config = BulkEditConfig::default();
        assert_eq!(config.monthly_edit_limit, None);
        assert_eq!(config.audit_cap, 50);
        assert_eq!(config.page_size, 250);
    }

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            database_url: SecretString::from("postgres://localhost/test".to_string()),
            host: "127.0.0.1".parse().unwrap(),
            port: 3002,
            shopify: ShopifyConfig {
                store: "test.myshopify.com".to_string(),
                api_version: "2026-01".to_string(),
                access_token: SecretString::from("shpat_test".to_string()),
                webhook_secret: SecretString::from("whsec_test".to_string()),
                weight_unit: "POUNDS".to_string(),
            },
            bulk_edit: BulkEditConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3002);
    }

    #[test]
    fn test_shopify_config_debug_redacts_secrets() {
        let config = ShopifyConfig {
            store: "test.myshopify.com".to_string(),
            api_version: "2026-01".to_string(),
            access_token: SecretString::from("shpat_super_private_token".to_string()),
            webhook_secret: SecretString::from("whsec_super_private_value".to_string()),
            weight_unit: "GRAMS".to_string(),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("test.myshopify.com"));
        assert!(debug_output.contains("GRAMS"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("shpat_super_private_token"));
        assert!(!debug_output.contains("whsec_super_private_value"));
    }
}
