//! Batchwise Core - the bulk modification engine.
//!
//! This crate is shared by both call sites of Batchwise:
//! - the interactive bulk-edit wizard (`batchwise-app` JSON API)
//! - the `products/update` webhook automation path
//!
//! Both go through the same filter evaluator, value transformer, change
//! planner and batch executor, so they behave identically.
//!
//! # Architecture
//!
//! The core contains no HTTP and no SQL. Everything it needs from the outside
//! world (the product catalog, the audit store, the usage counter, the
//! automation rule store) is reached through the async traits in [`ports`].
//! In-memory implementations of those traits live in [`memory`].
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, statuses and the product/variant snapshot
//! - [`registry`] - The editable and filterable field tables
//! - [`bulk`] - Filters, transforms, planning, execution, revert and automation
//! - [`ports`] - Collaborator traits
//! - [`memory`] - In-memory collaborators
//! - [`error`] - Engine error types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod bulk;
pub mod error;
pub mod memory;
pub mod ports;
pub mod registry;
pub mod types;

pub use error::{BulkEditError, CatalogError, StoreError};
pub use registry::{Field, FieldRegistry};
pub use types::*;
