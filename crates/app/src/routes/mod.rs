//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                      - Liveness
//! GET  /health/ready                                - Database readiness
//!
//! # Wizard (JSON)
//! GET  /api/fields                                  - Editable and filterable fields
//! POST /api/bulk-edit/preview                       - Filter and plan, no mutations
//! POST /api/bulk-edit/apply                         - Filter, plan and execute
//! GET  /api/usage                                   - Monthly usage against the limit
//!
//! # History
//! GET  /api/changesets                              - Recent changesets
//! GET  /api/changesets/{id}                         - One changeset with changes
//! POST /api/changesets/{id}/revert                  - Undo a whole changeset
//! POST /api/changesets/{id}/changes/{index}/revert  - Undo one change
//!
//! # Automation
//! POST /webhooks/products/update                    - Shopify product webhook
//! ```

pub mod bulk_edit;
pub mod changesets;
pub mod fields;
pub mod health;
pub mod webhooks;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::state::AppState;

/// Build the route table.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(fields::router())
        .merge(bulk_edit::router())
        .merge(changesets::router())
        .merge(webhooks::router())
}

/// Build the complete application with request tracing.
pub fn app(state: AppState) -> Router {
    routes()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
