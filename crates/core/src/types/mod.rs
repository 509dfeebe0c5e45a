//! Core types for Batchwise.
//!
//! This module provides type-safe wrappers for catalog IDs and statuses,
//! plus the in-memory product snapshot the engine works on.

pub mod id;
pub mod product;
pub mod status;

pub use id::*;
pub use product::{Product, Variant};
pub use status::*;
