//! Authenticated Admin API transport.

use std::sync::Arc;
use std::time::Duration;

use graphql_client::{QueryBody, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::{AdminShopifyError, GraphQLError};
use crate::config::ShopifyConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shopify Admin API GraphQL client.
///
/// Cheap to clone; all clones share one connection pool.
///
/// # Security
///
/// Holds the Admin API access token, which has write access to the whole
/// catalog.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    client: reqwest::Client,
    endpoint: String,
    store: String,
    access_token: SecretString,
    weight_unit: String,
    page_size: u32,
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("store", &self.inner.store)
            .field("endpoint", &self.inner.endpoint)
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl AdminClient {
    /// Create a new Admin API client.
    ///
    /// # Arguments
    ///
    /// * `config` - Shopify store, API version and credentials
    /// * `page_size` - Products requested per catalog page
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ShopifyConfig, page_size: u32) -> Result<Self, AdminShopifyError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            inner: Arc::new(AdminClientInner {
                client,
                endpoint: format!(
                    "https://{}/admin/api/{}/graphql.json",
                    config.store, config.api_version
                ),
                store: config.store.clone(),
                access_token: config.access_token.clone(),
                weight_unit: config.weight_unit.clone(),
                page_size,
            }),
        })
    }

    /// Get the store domain.
    #[must_use]
    pub fn store(&self) -> &str {
        &self.inner.store
    }

    /// Unit sent with variant weights.
    pub(super) fn weight_unit(&self) -> &str {
        &self.inner.weight_unit
    }

    pub(super) fn page_size(&self) -> u32 {
        self.inner.page_size
    }

    // =========================================================================
    // GraphQL Execution
    // =========================================================================

    /// Execute a GraphQL document.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::RateLimited` if we're being rate limited.
    /// Returns `AdminShopifyError::Unauthorized` if the token is rejected.
    /// Returns `AdminShopifyError::GraphQL` if the query returns errors.
    /// Returns `AdminShopifyError::Http` on network failures.
    #[instrument(skip(self, query, variables), fields(operation = operation_name))]
    pub(super) async fn execute<V, T>(
        &self,
        operation_name: &'static str,
        query: &'static str,
        variables: V,
    ) -> Result<T, AdminShopifyError>
    where
        V: Serialize + Send,
        T: DeserializeOwned,
    {
        let body = QueryBody {
            variables,
            query,
            operation_name,
        };

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header("X-Shopify-Access-Token", self.inner.access_token.expose_secret())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        // Check for rate limiting
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split('.').next())
                .and_then(|s| s.parse().ok())
                .unwrap_or(2);
            return Err(AdminShopifyError::RateLimited(retry_after));
        }

        // Check for unauthorized
        if matches!(
            response.status(),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN
        ) {
            return Err(AdminShopifyError::Unauthorized(
                "Invalid or expired access token".to_string(),
            ));
        }

        let graphql_response: Response<T> = response.json().await?;

        // Check for GraphQL errors
        if let Some(errors) = graphql_response.errors
            && !errors.is_empty()
        {
            debug!(count = errors.len(), "GraphQL errors in response");
            return Err(AdminShopifyError::GraphQL(
                errors.into_iter().map(GraphQLError::from).collect(),
            ));
        }

        graphql_response.data.ok_or_else(|| {
            AdminShopifyError::GraphQL(vec![GraphQLError {
                message: "No data in response".to_string(),
                locations: vec![],
                path: vec![],
            }])
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> ShopifyConfig {
        ShopifyConfig {
            store: "batchwise-test.myshopify.com".to_string(),
            api_version: "2026-01".to_string(),
            access_token: SecretString::from("shpat_k2J9xQ7mPz4vR8nW".to_string()),
            webhook_secret: SecretString::from("whsec_p4Lm8Qz2Xv7Nr3Kt".to_string()),
            weight_unit: "POUNDS".to_string(),
        }
    }

    #[test]
    fn test_endpoint_uses_store_and_version() {
        let client = AdminClient::new(&config(), 50).unwrap();
        assert_eq!(
            client.inner.endpoint,
            "https://batchwise-test.myshopify.com/admin/api/2026-01/graphql.json"
        );
        assert_eq!(client.page_size(), 50);
        assert_eq!(client.weight_unit(), "POUNDS");
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = AdminClient::new(&config(), 250).unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("shpat_"));
    }
}
