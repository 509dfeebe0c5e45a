//! Batchwise app library.
//!
//! The embedded Shopify app around `batchwise-core`: the bulk-edit JSON API,
//! the `products/update` automation webhook, `PostgreSQL` storage for the
//! audit trail, usage counters and rules, and the Shopify Admin GraphQL
//! catalog. Exposed as a library so the router can be tested in-process.
//!
//! # Security
//!
//! Holds a Shopify Admin API token with write access to products.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod services;
pub mod shopify;
pub mod state;
