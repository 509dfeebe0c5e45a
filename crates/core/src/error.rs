//! Error types for the bulk modification engine.
//!
//! Expected per-entity failures never surface here: they are folded into the
//! [`ExecutionReport`](crate::bulk::ExecutionReport). These errors cover
//! malformed input and whole-invocation preconditions.

use thiserror::Error;

use crate::registry::{ComparisonType, Field, FieldCategory};
use crate::types::ChangesetId;

/// Errors raised by the engine itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BulkEditError {
    /// Field name is not in the registry at all.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// Field exists but cannot be modified.
    #[error("field {0} is not editable")]
    FieldNotEditable(Field),

    /// Field exists but cannot be filtered on.
    #[error("field {0} is not filterable")]
    FieldNotFilterable(Field),

    /// Operator is not valid for the field's comparison type.
    #[error("operator {operator} is not valid for {comparison:?} field {field}")]
    InvalidOperator {
        field: Field,
        operator: String,
        comparison: ComparisonType,
    },

    /// Change type is not valid for the field's category.
    #[error("change type {change_type} is not valid for {category:?} field {field}")]
    InvalidChangeType {
        field: Field,
        change_type: String,
        category: FieldCategory,
    },

    /// A required value was missing.
    #[error("{0} requires a value")]
    MissingValue(String),

    /// A supplied value could not be used.
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: Field, value: String },

    /// Monthly edit quota used up; nothing was attempted.
    #[error("monthly edit limit reached ({usage}/{limit})")]
    QuotaExceeded { usage: u32, limit: u32 },

    /// No recorded change at this position of the changeset.
    #[error("changeset has no change at index {0}")]
    ChangeNotFound(usize),

    /// The changeset was already undone.
    #[error("changeset {0} has already been reverted")]
    AlreadyReverted(ChangesetId),

    /// A collaborator (audit store, usage counter, rule store) failed.
    #[error("collaborator error: {0}")]
    Collaborator(String),
}

/// Transport failure reaching the catalog for one request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The catalog could not be reached or returned an unusable response.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    /// The catalog rejected the request as a whole (auth, throttling).
    #[error("catalog rejected request: {0}")]
    Rejected(String),
}

/// Failure of a storage-backed collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing store failed.
    #[error("store error: {0}")]
    Backend(String),

    /// Stored data could not be decoded.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl From<StoreError> for BulkEditError {
    fn from(err: StoreError) -> Self {
        Self::Collaborator(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_exceeded_display() {
        let err = BulkEditError::QuotaExceeded {
            usage: 10,
            limit: 10,
        };
        assert_eq!(err.to_string(), "monthly edit limit reached (10/10)");
    }

    #[test]
    fn test_store_error_converts_to_collaborator() {
        let err: BulkEditError = StoreError::Backend("timeout".to_string()).into();
        assert_eq!(err, BulkEditError::Collaborator("store error: timeout".to_string()));
    }
}
