//! Change planner.
//!
//! Turns (products, specs) into the minimal list of field-level changes.
//! A computed value equal to the current value never produces a change, so
//! planning against converged state yields an empty changeset.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::modification::{ChangeKind, ModSpec};
use super::transform::compute;
use crate::error::BulkEditError;
use crate::registry::{Accessor, Field, FieldCategory, FieldDescriptor, FieldRegistry};
use crate::types::{Product, ProductId, Variant, VariantId};

/// One field-level change on a product or one of its variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub entity_id: ProductId,
    pub entity_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_entity_id: Option<VariantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_entity_label: Option<String>,
    pub field: Field,
    pub old_value: String,
    pub new_value: String,
    pub change_kind: ChangeKind,
    /// Unit of both values for a weight change, as the catalog reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_unit: Option<String>,
}

impl Change {
    /// The same change with old and new swapped.
    #[must_use]
    pub fn inverted(&self) -> Self {
        Self {
            old_value: self.new_value.clone(),
            new_value: self.old_value.clone(),
            change_kind: ChangeKind::Revert,
            ..self.clone()
        }
    }
}

/// Ordered changes for one execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Changeset(Vec<Change>);

impl Changeset {
    #[must_use]
    pub const fn new(changes: Vec<Change>) -> Self {
        Self(changes)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.0.iter()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Change> {
        self.0.get(index)
    }

    #[must_use]
    pub fn changes(&self) -> &[Change] {
        &self.0
    }

    /// Number of distinct products touched.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.0.iter().map(|c| &c.entity_id).collect::<HashSet<_>>().len()
    }

    /// Every change with old and new swapped, in the same order.
    #[must_use]
    pub fn inverted(&self) -> Self {
        Self(self.0.iter().map(Change::inverted).collect())
    }

    /// The first `cap` changes.
    #[must_use]
    pub fn truncated(&self, cap: usize) -> Self {
        Self(self.0.iter().take(cap).cloned().collect())
    }
}

impl From<Vec<Change>> for Changeset {
    fn from(changes: Vec<Change>) -> Self {
        Self(changes)
    }
}

impl<'a> IntoIterator for &'a Changeset {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Why a field produced no change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Already at the computed value.
    NoOp,
    /// The transformer could not compute a value.
    InvalidInput,
}

impl SkipReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoOp => "no_op",
            Self::InvalidInput => "invalid_input",
        }
    }
}

/// A field the planner looked at but did not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedField {
    pub entity_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_entity_id: Option<VariantId>,
    pub field: Field,
    pub reason: SkipReason,
}

/// A changeset plus what was left out of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub changeset: Changeset,
    pub skipped: Vec<SkippedField>,
}

/// Field-appropriate equality: parsed numbers for numeric fields, otherwise
/// exact strings.
#[allow(clippy::float_cmp)]
fn same_value(category: FieldCategory, old: &str, new: &str) -> bool {
    if category == FieldCategory::Numeric
        && let (Ok(a), Ok(b)) = (old.trim().parse::<f64>(), new.trim().parse::<f64>())
    {
        return a == b;
    }
    old == new
}

/// Specs that target one field, in input order.
struct FieldPlan<'s> {
    field: Field,
    descriptor: &'s FieldDescriptor,
    ops: Vec<&'s ModSpec>,
}

impl FieldPlan<'_> {
    /// Run every op in order on `current`. `None` if any step cannot compute.
    fn compute(&self, current: &str) -> Option<String> {
        self.ops.iter().try_fold(current.to_string(), |value, spec| {
            compute(&value, &spec.op, self.descriptor)
        })
    }

    /// The kind of the last op, which decides the final value.
    fn kind(&self) -> ChangeKind {
        self.ops.last().map_or(ChangeKind::Set, |spec| spec.kind())
    }
}

/// Group specs by field, keeping the order in which each field first
/// appears.
fn group_by_field<'s>(
    specs: &'s [ModSpec],
    registry: &'s FieldRegistry,
) -> Result<Vec<FieldPlan<'s>>, BulkEditError> {
    let mut plans: Vec<FieldPlan<'s>> = Vec::new();
    for spec in specs {
        if let Some(plan) = plans.iter_mut().find(|p| p.field == spec.field) {
            plan.ops.push(spec);
        } else {
            plans.push(FieldPlan {
                field: spec.field,
                descriptor: registry.editable(spec.field)?,
                ops: vec![spec],
            });
        }
    }
    Ok(plans)
}

/// Plan the changes for a set of products.
///
/// # Errors
///
/// Returns an error if a spec names a field that is not editable.
pub fn plan<'a, I>(
    products: I,
    specs: &[ModSpec],
    registry: &FieldRegistry,
) -> Result<Changeset, BulkEditError>
where
    I: IntoIterator<Item = &'a Product>,
{
    plan_detailed(products, specs, registry).map(|outcome| outcome.changeset)
}

/// Like [`plan`], but also reports every suppressed field and why.
///
/// Specs on the same field are chained in input order and yield at most one
/// change per product or variant. Order is products in input order, then
/// fields in order of first appearance, then variants in catalog order.
///
/// # Errors
///
/// Returns an error if a spec names a field that is not editable.
pub fn plan_detailed<'a, I>(
    products: I,
    specs: &[ModSpec],
    registry: &FieldRegistry,
) -> Result<PlanOutcome, BulkEditError>
where
    I: IntoIterator<Item = &'a Product>,
{
    let fields = group_by_field(specs, registry)?;

    let mut outcome = PlanOutcome::default();
    let mut changes = Vec::new();

    for product in products {
        for field_plan in &fields {
            let field = field_plan.field;
            let category = field_plan.descriptor.category;
            let mut consider = |variant: Option<&Variant>, old: String| {
                let sub_entity_id = variant.map(|v| v.id.clone());
                let skip = |reason: SkipReason| {
                    debug!(
                        product_id = %product.id,
                        variant_id = ?sub_entity_id,
                        field = %field,
                        reason = reason.as_str(),
                        "Field skipped"
                    );
                    SkippedField {
                        entity_id: product.id.clone(),
                        sub_entity_id: sub_entity_id.clone(),
                        field,
                        reason,
                    }
                };
                match field_plan.compute(&old) {
                    None => outcome.skipped.push(skip(SkipReason::InvalidInput)),
                    Some(new) if same_value(category, &old, &new) => {
                        outcome.skipped.push(skip(SkipReason::NoOp));
                    }
                    Some(new) => changes.push(Change {
                        entity_id: product.id.clone(),
                        entity_label: product.title.clone(),
                        sub_entity_id: sub_entity_id.clone(),
                        sub_entity_label: variant.map(|v| v.title.clone()),
                        field,
                        old_value: old,
                        new_value: new,
                        change_kind: field_plan.kind(),
                        weight_unit: variant
                            .filter(|_| field == Field::Weight)
                            .and_then(|v| v.weight_unit.clone()),
                    }),
                }
            };

            match field_plan.descriptor.accessor {
                Accessor::Product(read) => consider(None, read(product)),
                Accessor::Variant(read) => {
                    for variant in &product.variants {
                        consider(Some(variant), read(variant));
                    }
                }
            }
        }
    }

    outcome.changeset = Changeset::new(changes);
    Ok(outcome)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::bulk::modification::{ChangeType, ModSpecInput, RoundingMode};
    use crate::types::ProductStatus;

    fn product(id: &str, prices: &[&str]) -> Product {
        Product {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            handle: format!("product-{id}"),
            vendor: "Acme".to_string(),
            product_type: "Shirts".to_string(),
            status: ProductStatus::Active,
            tags: vec!["sale".to_string()],
            template_suffix: None,
            variants: prices
                .iter()
                .enumerate()
                .map(|(i, price)| Variant {
                    id: VariantId::new(format!("{id}{i}")),
                    title: format!("Size {i}"),
                    price: (*price).to_string(),
                    compare_at_price: None,
                    sku: None,
                    barcode: None,
                    weight: None,
                    weight_unit: None,
                    inventory_quantity: 0,
                    taxable: true,
                })
                .collect(),
        }
    }

    fn specs(inputs: &[ModSpecInput]) -> Vec<ModSpec> {
        ModSpec::from_inputs(inputs, &FieldRegistry::standard()).unwrap()
    }

    #[test]
    fn test_exact_same_price_is_no_op() {
        let registry = FieldRegistry::standard();
        let products = [product("1", &["10.00"])];
        let specs = specs(&[ModSpecInput::new(Field::Price, ChangeType::Exact, "10.00")]);
        let outcome = plan_detailed(&products, &specs, &registry).unwrap();
        assert!(outcome.changeset.is_empty());
        assert_eq!(outcome.skipped[0].reason, SkipReason::NoOp);
    }

    #[test]
    fn test_numeric_equality_ignores_formatting() {
        let registry = FieldRegistry::standard();
        let products = [product("1", &["10"])];
        let specs = specs(&[ModSpecInput::new(Field::Price, ChangeType::Exact, "10")]);
        assert!(plan(&products, &specs, &registry).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_input_is_distinguished_from_no_op() {
        let registry = FieldRegistry::standard();
        let products = [product("1", &["abc", "10.00"])];
        let specs = specs(&[ModSpecInput::new(Field::Price, ChangeType::IncreaseFixed, "1")]);
        let outcome = plan_detailed(&products, &specs, &registry).unwrap();
        assert_eq!(outcome.changeset.len(), 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].reason, SkipReason::InvalidInput);
        assert_eq!(outcome.skipped[0].sub_entity_id, Some(VariantId::new("10")));
    }

    #[test]
    fn test_order_is_product_then_spec_then_variant() {
        let registry = FieldRegistry::standard();
        let products = [product("1", &["1.00", "2.00"]), product("2", &["3.00"])];
        let specs = specs(&[
            ModSpecInput::new(Field::Price, ChangeType::IncreaseFixed, "1"),
            ModSpecInput::new(Field::Vendor, ChangeType::Set, "Globex"),
        ]);
        let changeset = plan(&products, &specs, &registry).unwrap();
        let order: Vec<(String, Field, Option<String>)> = changeset
            .iter()
            .map(|c| {
                (
                    c.entity_id.numeric_id().to_string(),
                    c.field,
                    c.sub_entity_id.as_ref().map(|v| v.numeric_id().to_string()),
                )
            })
            .collect();
        assert_eq!(
            order,
            vec![
                ("1".to_string(), Field::Price, Some("10".to_string())),
                ("1".to_string(), Field::Price, Some("11".to_string())),
                ("1".to_string(), Field::Vendor, None),
                ("2".to_string(), Field::Price, Some("20".to_string())),
                ("2".to_string(), Field::Vendor, None),
            ]
        );
        assert_eq!(changeset.entity_count(), 2);
    }

    #[test]
    fn test_specs_on_one_field_merge_into_one_change() {
        let registry = FieldRegistry::standard();
        let products = [product("1", &["4.00"])];
        let specs = specs(&[
            ModSpecInput::new(Field::Price, ChangeType::Exact, "10.00"),
            ModSpecInput::new(Field::Price, ChangeType::Exact, "12.00"),
        ]);
        let changeset = plan(&products, &specs, &registry).unwrap();
        assert_eq!(changeset.len(), 1);
        let change = changeset.get(0).unwrap();
        assert_eq!(change.old_value, "4.00");
        assert_eq!(change.new_value, "12.00");

        let converged = [product("1", &["12.00"])];
        assert!(plan(&converged, &specs, &registry).unwrap().is_empty());
    }

    #[test]
    fn test_specs_on_one_field_chain_in_order() {
        let registry = FieldRegistry::standard();
        let products = [product("1", &["20.00"])];
        let specs = specs(&[
            ModSpecInput::new(Field::Price, ChangeType::IncreasePercent, "10"),
            ModSpecInput::new(Field::Vendor, ChangeType::Set, "Globex"),
            ModSpecInput::new(Field::Price, ChangeType::DecreaseFixed, "1"),
        ]);
        let changeset = plan(&products, &specs, &registry).unwrap();
        assert_eq!(changeset.len(), 2);
        let price = changeset.get(0).unwrap();
        assert_eq!(price.field, Field::Price);
        assert_eq!(price.old_value, "20.00");
        assert_eq!(price.new_value, "21.00");
        assert_eq!(price.change_kind, ChangeKind::DecreaseFixed);
        assert_eq!(changeset.get(1).unwrap().field, Field::Vendor);
    }

    #[test]
    fn test_change_records_labels_and_kind() {
        let registry = FieldRegistry::standard();
        let products = [product("1", &["19.50"])];
        let specs = specs(&[ModSpecInput::new(Field::Price, ChangeType::IncreaseFixed, "5")
            .with_rounding(RoundingMode::Round99)]);
        let changeset = plan(&products, &specs, &registry).unwrap();
        let change = changeset.get(0).unwrap();
        assert_eq!(change.entity_label, "Product 1");
        assert_eq!(change.sub_entity_label.as_deref(), Some("Size 0"));
        assert_eq!(change.old_value, "19.50");
        assert_eq!(change.new_value, "24.99");
        assert_eq!(change.change_kind, ChangeKind::IncreaseFixed);
    }

    #[test]
    fn test_inverted_swaps_values() {
        let registry = FieldRegistry::standard();
        let products = [product("1", &["1.00"])];
        let specs = specs(&[ModSpecInput::new(Field::Tags, ChangeType::Add, "new")]);
        let changeset = plan(&products, &specs, &registry).unwrap();
        let inverted = changeset.inverted();
        let change = inverted.get(0).unwrap();
        assert_eq!(change.old_value, "sale, new");
        assert_eq!(change.new_value, "sale");
        assert_eq!(change.change_kind, ChangeKind::Revert);
    }

    #[test]
    fn test_changeset_serializes_as_list() {
        let registry = FieldRegistry::standard();
        let products = [product("1", &[])];
        let specs = specs(&[ModSpecInput::new(Field::Title, ChangeType::Append, "!")]);
        let changeset = plan(&products, &specs, &registry).unwrap();
        let json = serde_json::to_value(&changeset).unwrap();
        assert_eq!(json[0]["entityLabel"], "Product 1");
        assert_eq!(json[0]["newValue"], "Product 1!");
        assert_eq!(json[0]["changeKind"], "append");
        let back: Changeset = serde_json::from_value(json).unwrap();
        assert_eq!(back, changeset);
    }
}
