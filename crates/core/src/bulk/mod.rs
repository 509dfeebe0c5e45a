//! The bulk modification pipeline.
//!
//! filter → plan (transform + no-op suppression) → execute → (revert)

pub mod automation;
pub mod execute;
pub mod filter;
pub mod modification;
pub mod plan;
pub mod quota;
pub mod revert;
pub mod transform;

pub use automation::{AutomationEngine, AutomationRule, RuleOutcome, RuleRun};
pub use execute::{
    BatchExecutor, EntityErrors, ExecutionContext, ExecutionOutcome, ExecutionReport,
    ProductPatch, VariantPatch,
};
pub use filter::{FilterRule, Operator, filter_products, matches, matches_all, validate_all};
pub use modification::{
    ChangeKind, ChangeType, FieldOp, ModSpec, ModSpecInput, NumericChange, RoundingMode, TagOp,
    TextOp,
};
pub use plan::{Change, Changeset, PlanOutcome, SkipReason, SkippedField, plan, plan_detailed};
pub use quota::QuotaPolicy;
pub use revert::{RevertScope, invert};
pub use transform::compute;
