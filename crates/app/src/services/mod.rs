//! Business logic services for the app.
//!
//! # Services
//!
//! - `bulk_edit` - Wizard preview, apply, history, revert and usage

pub mod bulk_edit;

pub use bulk_edit::{
    ApplyResponse, BulkEditRequest, BulkEditService, PreviewResponse, UsageResponse,
};
