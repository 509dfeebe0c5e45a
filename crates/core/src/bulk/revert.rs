//! Reversal path.
//!
//! A revert is the recorded changeset with old and new swapped, fed through
//! the same apply path as a forward edit. There is no no-op check and no
//! re-fetch: whatever the catalog holds now is overwritten with the recorded
//! old value.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use super::execute::{BatchExecutor, ExecutionReport};
use super::plan::Changeset;
use crate::error::BulkEditError;
use crate::ports::{AuditEntry, ChangesetRecord};
use crate::types::{ChangeSource, ChangesetStatus};

/// What part of a recorded changeset to undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope", content = "index")]
pub enum RevertScope {
    /// Every recorded change.
    Batch,
    /// One recorded change, by position.
    Single(usize),
}

/// Swap old and new on every change.
#[must_use]
pub fn invert(changeset: &Changeset) -> Changeset {
    changeset.inverted()
}

impl BatchExecutor {
    /// Undo a recorded changeset, or one change of it.
    ///
    /// Writes one audit entry per reverted change with source `revert`. A
    /// whole-batch revert with no errors marks the record `reverted`. Usage
    /// is not counted.
    ///
    /// # Errors
    ///
    /// Returns an error if the changeset was already reverted or the index is
    /// out of range. Catalog failures are reported, not returned.
    #[instrument(
        skip(self, record),
        fields(shop = %record.summary.shop, changeset_id = %record.summary.id)
    )]
    pub async fn revert(
        &self,
        record: &ChangesetRecord,
        scope: RevertScope,
    ) -> Result<ExecutionReport, BulkEditError> {
        let summary = &record.summary;
        if summary.status == ChangesetStatus::Reverted {
            return Err(BulkEditError::AlreadyReverted(summary.id));
        }

        let inverted = match scope {
            RevertScope::Batch => invert(&record.changes),
            RevertScope::Single(index) => {
                let change = record
                    .changes
                    .get(index)
                    .ok_or(BulkEditError::ChangeNotFound(index))?;
                Changeset::new(vec![change.inverted()])
            }
        };

        let (report, applied) = self.apply(&inverted).await;

        let now = Utc::now();
        let entries: Vec<AuditEntry> = applied
            .iter()
            .map(|change| {
                AuditEntry::from_change(
                    &summary.shop,
                    Some(summary.id),
                    ChangeSource::Revert,
                    change,
                    now,
                )
            })
            .collect();
        if !entries.is_empty()
            && let Err(e) = self.audit().append_entries(&entries).await
        {
            error!(error = %e, count = entries.len(), "Failed to append revert audit entries");
        }

        if scope == RevertScope::Batch
            && report.error_count == 0
            && let Err(e) = self.audit().mark_reverted(&summary.shop, summary.id).await
        {
            error!(error = %e, "Failed to mark changeset reverted");
        }

        info!(
            ?scope,
            success_count = report.success_count,
            error_count = report.error_count,
            "Changeset reverted"
        );

        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::bulk::modification::ChangeKind;
    use crate::bulk::plan::Change;
    use crate::registry::Field;
    use crate::types::ProductId;

    #[test]
    fn test_invert_is_structural() {
        let changeset = Changeset::new(vec![Change {
            entity_id: ProductId::new("1"),
            entity_label: "Tee".to_string(),
            sub_entity_id: None,
            sub_entity_label: None,
            field: Field::Title,
            old_value: "Tee".to_string(),
            new_value: "Shirt".to_string(),
            change_kind: ChangeKind::Set,
            weight_unit: None,
        }]);
        let inverted = invert(&changeset);
        assert_eq!(inverted.len(), 1);
        assert_eq!(inverted.get(0).unwrap().old_value, "Shirt");
        assert_eq!(inverted.get(0).unwrap().change_kind, ChangeKind::Revert);
        assert_eq!(invert(&inverted).get(0).unwrap().old_value, "Tee");
    }

    #[test]
    fn test_scope_wire_format() {
        let json = serde_json::to_value(RevertScope::Single(3)).unwrap();
        assert_eq!(json, serde_json::json!({"scope": "single", "index": 3}));
        let json = serde_json::to_value(RevertScope::Batch).unwrap();
        assert_eq!(json, serde_json::json!({"scope": "batch"}));
    }
}
