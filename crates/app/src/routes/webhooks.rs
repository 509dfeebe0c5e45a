//! Shopify webhook handlers.
//!
//! `products/update` drives the automation path. The payload is only used to
//! find the product; the snapshot the rules see is re-fetched from the
//! catalog so it is no older than this request.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use batchwise_core::ProductId;
use batchwise_core::bulk::RuleRun;
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, info, instrument, warn};

use crate::error::AppError;
use crate::state::AppState;

const HMAC_HEADER: &str = "X-Shopify-Hmac-Sha256";
const SHOP_HEADER: &str = "X-Shopify-Shop-Domain";

type HmacSha256 = Hmac<Sha256>;

/// Build the webhooks router.
pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/products/update", post(product_updated))
}

/// The part of the `products/update` payload we read.
#[derive(Debug, Deserialize)]
struct ProductWebhook {
    admin_graphql_api_id: Option<String>,
    id: Option<serde_json::Value>,
}

impl ProductWebhook {
    fn product_id(&self) -> Option<ProductId> {
        if let Some(gid) = self.admin_graphql_api_id.as_deref().filter(|s| !s.is_empty()) {
            return Some(ProductId::new(gid));
        }
        match self.id.as_ref()? {
            serde_json::Value::Number(n) => Some(ProductId::new(n.to_string())),
            serde_json::Value::String(s) if !s.is_empty() => Some(ProductId::new(s.as_str())),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub product_id: Option<ProductId>,
    pub runs: Vec<RuleRun>,
}

/// Check a base64 HMAC-SHA256 signature of `body`.
///
/// Comparison is constant-time.
pub fn verify_signature(secret: &[u8], body: &[u8], signature: &str) -> bool {
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Handle `products/update`.
///
/// # Errors
///
/// Returns 401 for a missing or bad signature, 400 for a payload without a
/// product ID or for another shop, 502 if the product cannot be re-fetched.
#[instrument(skip_all)]
pub async fn product_updated(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    let signature = headers
        .get(HMAC_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing webhook signature".to_string()))?;
    let secret = state.settings().webhook_secret.expose_secret().as_bytes();
    if !verify_signature(secret, &body, signature) {
        warn!("Webhook signature mismatch");
        return Err(AppError::Unauthorized("invalid webhook signature".to_string()));
    }

    let shop = state.shop();
    if let Some(domain) = headers.get(SHOP_HEADER).and_then(|v| v.to_str().ok())
        && !domain.eq_ignore_ascii_case(shop)
    {
        return Err(AppError::BadRequest(format!("webhook for unknown shop {domain}")));
    }

    let payload: ProductWebhook = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("invalid webhook payload: {e}")))?;
    let product_id = payload
        .product_id()
        .ok_or_else(|| AppError::BadRequest("webhook payload has no product id".to_string()))?;

    let Some(product) = state.catalog().fetch_product(&product_id).await? else {
        debug!(product_id = %product_id, "Product no longer exists");
        return Ok(Json(WebhookResponse {
            product_id: Some(product_id),
            runs: Vec::new(),
        }));
    };

    let runs = state.automation().on_product_updated(shop, product).await?;
    info!(product_id = %product_id, rules = runs.len(), "Automation rules evaluated");

    Ok(Json(WebhookResponse {
        product_id: Some(product_id),
        runs,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sign(secret: &[u8], body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret).unwrap();
        mac.update(body);
        STANDARD.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_verify_signature_accepts_valid() {
        let body = br#"{"id":1}"#;
        let signature = sign(b"hush", body);
        assert!(verify_signature(b"hush", body, &signature));
    }

    #[test]
    fn test_verify_signature_rejects_tampered_body() {
        let signature = sign(b"hush", br#"{"id":1}"#);
        assert!(!verify_signature(b"hush", br#"{"id":2}"#, &signature));
        assert!(!verify_signature(b"other", br#"{"id":1}"#, &signature));
        assert!(!verify_signature(b"hush", br#"{"id":1}"#, "not base64!"));
    }

    #[test]
    fn test_product_id_prefers_gid() {
        let payload: ProductWebhook = serde_json::from_value(serde_json::json!({
            "id": 42,
            "admin_graphql_api_id": "gid://shopify/Product/42"
        }))
        .unwrap();
        assert_eq!(payload.product_id().unwrap().as_str(), "gid://shopify/Product/42");

        let payload: ProductWebhook = serde_json::from_value(serde_json::json!({"id": 7})).unwrap();
        assert_eq!(payload.product_id().unwrap().as_str(), "gid://shopify/Product/7");

        let payload: ProductWebhook = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(payload.product_id().is_none());
    }
}
