//! Batchwise - bulk product editing for Shopify.
//!
//! This binary serves the app API on port 3002.
//!
//! # Architecture
//!
//! - Axum web framework, JSON only
//! - Shopify Admin GraphQL API as the product catalog
//! - `PostgreSQL` for changesets, usage counters and automation rules
//! - Shopify `products/update` webhook for automation rules

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use batchwise_app::config::AppConfig;
use batchwise_app::shopify::AdminClient;
use batchwise_app::state::{AppState, Ports, Settings};
use batchwise_app::{db, routes};
use batchwise_core::FieldRegistry;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &AppConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "batchwise_app=info,batchwise_core=info,tower_http=debug".into()
    });

    // Use JSON format on Fly.io for structured log parsing, text format locally
    let is_fly = std::env::var("FLY_APP_NAME").is_ok();
    let json_layer = is_fly.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!is_fly).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    // NOTE: the batchwise schema is provisioned outside this binary

    let catalog = AdminClient::new(&config.shopify, config.bulk_edit.page_size)
        .expect("Failed to create Shopify Admin client");
    tracing::info!(store = %catalog.store(), "Shopify Admin client created");

    let registry = Arc::new(FieldRegistry::standard());
    let ports = Ports::postgres(&pool, Arc::new(catalog), Arc::clone(&registry));
    let state = AppState::new(Settings::from_config(&config), registry, ports, Some(pool));

    let app = routes::app(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("batchwise listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
