//! Status enums for catalog entities and changesets.

use serde::{Deserialize, Serialize};

/// Product publication status.
///
/// Maps to Shopify's `ProductStatus` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    #[default]
    Active,
    Draft,
    Archived,
}

impl ProductStatus {
    /// Wire representation (`ACTIVE`, `DRAFT`, `ARCHIVED`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Draft => "DRAFT",
            Self::Archived => "ARCHIVED",
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "DRAFT" => Ok(Self::Draft),
            "ARCHIVED" => Ok(Self::Archived),
            _ => Err(format!("invalid product status: {s}")),
        }
    }
}

/// Aggregate status of an executed changeset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangesetStatus {
    /// Every change was applied.
    Completed,
    /// Some changes failed.
    Partial,
    /// Nothing was applied.
    Failed,
    /// The changeset has since been undone.
    Reverted,
}

impl ChangesetStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
            Self::Reverted => "reverted",
        }
    }
}

impl std::fmt::Display for ChangesetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChangesetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(Self::Completed),
            "partial" => Ok(Self::Partial),
            "failed" => Ok(Self::Failed),
            "reverted" => Ok(Self::Reverted),
            _ => Err(format!("invalid changeset status: {s}")),
        }
    }
}

/// Which call site produced an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSource {
    /// Interactive bulk-edit wizard.
    BulkEdit,
    /// Webhook-triggered automation rule.
    Automation,
    /// Undo of an earlier changeset or change.
    Revert,
}

impl ChangeSource {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BulkEdit => "bulk_edit",
            Self::Automation => "automation",
            Self::Revert => "revert",
        }
    }
}

impl std::fmt::Display for ChangeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChangeSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bulk_edit" => Ok(Self::BulkEdit),
            "automation" => Ok(Self::Automation),
            "revert" => Ok(Self::Revert),
            _ => Err(format!("invalid change source: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_status_parse_is_case_insensitive() {
        assert_eq!("draft".parse::<ProductStatus>(), Ok(ProductStatus::Draft));
        assert_eq!(" ARCHIVED ".parse::<ProductStatus>(), Ok(ProductStatus::Archived));
        assert!("deleted".parse::<ProductStatus>().is_err());
    }

    #[test]
    fn test_changeset_status_round_trips_through_str() {
        for status in [
            ChangesetStatus::Completed,
            ChangesetStatus::Partial,
            ChangesetStatus::Failed,
            ChangesetStatus::Reverted,
        ] {
            assert_eq!(status.as_str().parse::<ChangesetStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_change_source_display() {
        assert_eq!(ChangeSource::BulkEdit.to_string(), "bulk_edit");
        assert_eq!(ChangeSource::Revert.to_string(), "revert");
    }
}
