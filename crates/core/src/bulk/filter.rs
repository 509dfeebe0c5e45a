//! Filter evaluator.
//!
//! A [`FilterRule`] is a predicate over one field. Variant-owned fields match
//! when any variant satisfies the predicate. A rule set is a conjunction.

use serde::{Deserialize, Serialize};

use crate::error::BulkEditError;
use crate::registry::{Accessor, ComparisonType, Field, FieldRegistry};
use crate::types::Product;

/// Filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Contains,
    NotContains,
    Equals,
    NotEquals,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Between,
}

impl Operator {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::IsEmpty => "is_empty",
            Self::IsNotEmpty => "is_not_empty",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::GreaterOrEqual => "greater_or_equal",
            Self::LessOrEqual => "less_or_equal",
            Self::Between => "between",
        }
    }

    const ALL: [Self; 13] = [
        Self::Contains,
        Self::NotContains,
        Self::Equals,
        Self::NotEquals,
        Self::StartsWith,
        Self::EndsWith,
        Self::IsEmpty,
        Self::IsNotEmpty,
        Self::GreaterThan,
        Self::LessThan,
        Self::GreaterOrEqual,
        Self::LessOrEqual,
        Self::Between,
    ];

    /// Operators usable with a comparison type, in display order.
    #[must_use]
    pub fn allowed_for(comparison: ComparisonType) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|op| op.valid_for(comparison))
            .collect()
    }

    /// Whether this operator may be used with the given comparison type.
    #[must_use]
    pub const fn valid_for(&self, comparison: ComparisonType) -> bool {
        match comparison {
            ComparisonType::Text => matches!(
                self,
                Self::Contains
                    | Self::NotContains
                    | Self::Equals
                    | Self::NotEquals
                    | Self::StartsWith
                    | Self::EndsWith
                    | Self::IsEmpty
                    | Self::IsNotEmpty
            ),
            ComparisonType::Number => matches!(
                self,
                Self::Equals
                    | Self::NotEquals
                    | Self::GreaterThan
                    | Self::LessThan
                    | Self::GreaterOrEqual
                    | Self::LessOrEqual
                    | Self::Between
            ),
            ComparisonType::Select => matches!(self, Self::Equals | Self::NotEquals),
        }
    }

    /// `is_empty` and `is_not_empty` take no operand.
    #[must_use]
    pub const fn needs_value(&self) -> bool {
        !matches!(self, Self::IsEmpty | Self::IsNotEmpty)
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single predicate over one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub field: Field,
    pub operator: Operator,
    #[serde(default)]
    pub value: String,
    /// Upper bound, used only by `between`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<String>,
}

impl FilterRule {
    #[must_use]
    pub fn new(field: Field, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            field,
            operator,
            value: value.into(),
            value2: None,
        }
    }

    #[must_use]
    pub fn between(field: Field, low: impl Into<String>, high: impl Into<String>) -> Self {
        Self {
            field,
            operator: Operator::Between,
            value: low.into(),
            value2: Some(high.into()),
        }
    }

    /// Check the rule against the registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is not filterable, the operator does not
    /// apply to the field's comparison type, or a required operand is missing.
    pub fn validate(&self, registry: &FieldRegistry) -> Result<(), BulkEditError> {
        let descriptor = registry.filterable(self.field)?;
        if !self.operator.valid_for(descriptor.comparison) {
            return Err(BulkEditError::InvalidOperator {
                field: self.field,
                operator: self.operator.to_string(),
                comparison: descriptor.comparison,
            });
        }
        if self.operator.needs_value() && self.value.trim().is_empty() {
            return Err(BulkEditError::MissingValue(format!(
                "{} filter on {}",
                self.operator, self.field
            )));
        }
        if self.operator == Operator::Between
            && self.value2.as_deref().is_none_or(|v| v.trim().is_empty())
        {
            return Err(BulkEditError::MissingValue(format!(
                "upper bound of between filter on {}",
                self.field
            )));
        }
        Ok(())
    }
}

/// Validate every rule in a set.
///
/// # Errors
///
/// Returns the first invalid rule's error.
pub fn validate_all(rules: &[FilterRule], registry: &FieldRegistry) -> Result<(), BulkEditError> {
    rules.iter().try_for_each(|rule| rule.validate(registry))
}

/// Parse a number for comparison. Unparseable input becomes NaN, and every
/// relational comparison against NaN is false.
fn parse_number(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(f64::NAN)
}

#[allow(clippy::float_cmp)]
fn compare(current: &str, rule: &FilterRule, comparison: ComparisonType) -> bool {
    match comparison {
        ComparisonType::Text => {
            let current = current.to_lowercase();
            let value = rule.value.to_lowercase();
            match rule.operator {
                Operator::Contains => current.contains(&value),
                Operator::NotContains => !current.contains(&value),
                Operator::Equals => current == value,
                Operator::NotEquals => current != value,
                Operator::StartsWith => current.starts_with(&value),
                Operator::EndsWith => current.ends_with(&value),
                Operator::IsEmpty => current.trim().is_empty(),
                Operator::IsNotEmpty => !current.trim().is_empty(),
                _ => false,
            }
        }
        ComparisonType::Number => {
            let current = parse_number(current);
            let value = parse_number(&rule.value);
            match rule.operator {
                Operator::Equals => current == value,
                Operator::NotEquals => current != value,
                Operator::GreaterThan => current > value,
                Operator::LessThan => current < value,
                Operator::GreaterOrEqual => current >= value,
                Operator::LessOrEqual => current <= value,
                Operator::Between => {
                    let high = parse_number(rule.value2.as_deref().unwrap_or_default());
                    current >= value && current <= high
                }
                _ => false,
            }
        }
        ComparisonType::Select => match rule.operator {
            Operator::Equals => current.eq_ignore_ascii_case(&rule.value),
            Operator::NotEquals => !current.eq_ignore_ascii_case(&rule.value),
            _ => false,
        },
    }
}

/// Evaluate one rule against one product.
///
/// A field missing from the filterable registry never matches; callers are
/// expected to [`FilterRule::validate`] rules up front.
#[must_use]
pub fn matches(product: &Product, rule: &FilterRule, registry: &FieldRegistry) -> bool {
    let Ok(descriptor) = registry.filterable(rule.field) else {
        return false;
    };
    match descriptor.accessor {
        Accessor::Product(read) => compare(&read(product), rule, descriptor.comparison),
        Accessor::Variant(read) => product
            .variants
            .iter()
            .any(|variant| compare(&read(variant), rule, descriptor.comparison)),
    }
}

/// Evaluate a conjunction of rules. An empty set matches everything.
#[must_use]
pub fn matches_all(product: &Product, rules: &[FilterRule], registry: &FieldRegistry) -> bool {
    rules.iter().all(|rule| matches(product, rule, registry))
}

/// Narrow a candidate set to the products matching every rule.
#[must_use]
pub fn filter_products<'a>(
    products: &'a [Product],
    rules: &[FilterRule],
    registry: &FieldRegistry,
) -> Vec<&'a Product> {
    products
        .iter()
        .filter(|product| matches_all(product, rules, registry))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{ProductId, ProductStatus, Variant, VariantId};

    fn variant(id: &str, price: &str) -> Variant {
        Variant {
            id: VariantId::new(id),
            title: format!("Variant {id}"),
            price: price.to_string(),
            compare_at_price: None,
            sku: None,
            barcode: None,
            weight: None,
            weight_unit: None,
            inventory_quantity: 0,
            taxable: true,
        }
    }

    fn check(product: &Product, field: Field, operator: Operator, value: &str) -> bool {
        matches(product, &FilterRule::new(field, operator, value), &FieldRegistry::standard())
    }

    fn product(title: &str, prices: &[&str]) -> Product {
        Product {
            id: ProductId::new("1"),
            title: title.to_string(),
            handle: title.to_lowercase(),
            vendor: "Acme".to_string(),
            product_type: String::new(),
            status: ProductStatus::Active,
            tags: vec!["sale".to_string(), "summer".to_string()],
            template_suffix: None,
            variants: prices
                .iter()
                .enumerate()
                .map(|(i, p)| variant(&i.to_string(), p))
                .collect(),
        }
    }

    #[test]
    fn test_allowed_operators_per_comparison() {
        assert_eq!(
            Operator::allowed_for(ComparisonType::Select),
            vec![Operator::Equals, Operator::NotEquals]
        );
        assert!(Operator::allowed_for(ComparisonType::Number).contains(&Operator::Between));
        assert!(!Operator::allowed_for(ComparisonType::Text).contains(&Operator::Between));
    }

    #[test]
    fn test_variant_fields_match_existentially() {
        let p = product("Tee", &["5.00", "50.00"]);
        assert!(check(&p, Field::Price, Operator::GreaterThan, "20"));
        assert!(!check(&p, Field::Price, Operator::GreaterThan, "100"));
    }

    #[test]
    fn test_variant_title_compares_joined_titles() {
        let mut p = product("Tee", &["5.00", "6.00"]);
        p.variants[0].title = "Small".to_string();
        p.variants[1].title = "XL".to_string();

        assert!(check(&p, Field::VariantTitle, Operator::Contains, "xl"));
        assert!(!check(&p, Field::VariantTitle, Operator::NotContains, "XL"));
        assert!(check(&p, Field::VariantTitle, Operator::NotContains, "Medium"));
        assert!(check(&p, Field::VariantTitle, Operator::Equals, "small, xl"));
        assert!(check(&p, Field::VariantTitle, Operator::NotEquals, "Small"));
        assert!(!check(&p, Field::VariantTitle, Operator::NotEquals, "Small, XL"));
    }

    #[test]
    fn test_text_comparisons_ignore_case() {
        let p = product("Linen Shirt", &["10"]);
        assert!(check(&p, Field::Title, Operator::Contains, "LINEN"));
        assert!(check(&p, Field::Title, Operator::StartsWith, "linen"));
        assert!(check(&p, Field::Title, Operator::EndsWith, "SHIRT"));
        assert!(!check(&p, Field::Title, Operator::NotContains, "shirt"));
    }

    #[test]
    fn test_tags_are_flattened() {
        let p = product("Tee", &["10"]);
        assert!(check(&p, Field::Tags, Operator::Contains, "sale, summer"));
    }

    #[test]
    fn test_is_empty_ignores_value() {
        let registry = FieldRegistry::standard();
        let p = product("Tee", &["10"]);
        let rule = FilterRule::new(Field::ProductType, Operator::IsEmpty, "");
        assert!(rule.validate(&registry).is_ok());
        assert!(matches(&p, &rule, &registry));
        assert!(!check(&p, Field::ProductType, Operator::IsNotEmpty, "ignored"));
    }

    #[test]
    fn test_between_is_inclusive() {
        let registry = FieldRegistry::standard();
        let p = product("Tee", &["20.00"]);
        assert!(matches(&p, &FilterRule::between(Field::Price, "20", "30"), &registry));
        assert!(matches(&p, &FilterRule::between(Field::Price, "10", "20"), &registry));
        assert!(!matches(&p, &FilterRule::between(Field::Price, "20.01", "30"), &registry));
    }

    #[test]
    fn test_unparseable_numbers_never_compare() {
        let p = product("Tee", &["abc"]);
        assert!(!check(&p, Field::Price, Operator::GreaterThan, "0"));
        assert!(!check(&p, Field::Price, Operator::LessThan, "0"));
        assert!(!check(&p, Field::Price, Operator::Equals, "abc"));
    }

    #[test]
    fn test_select_equality() {
        let p = product("Tee", &["10"]);
        assert!(check(&p, Field::Status, Operator::Equals, "active"));
        assert!(check(&p, Field::Status, Operator::NotEquals, "DRAFT"));
    }

    #[test]
    fn test_empty_rule_set_matches_everything() {
        let registry = FieldRegistry::standard();
        let products = vec![product("A", &["1"]), product("B", &[])];
        assert_eq!(filter_products(&products, &[], &registry).len(), 2);
    }

    #[test]
    fn test_product_without_variants_never_matches_variant_fields() {
        let p = product("Tee", &[]);
        assert!(!check(&p, Field::Sku, Operator::IsEmpty, ""));
    }

    #[test]
    fn test_validate_rejects_mismatched_operator() {
        let registry = FieldRegistry::standard();
        let rule = FilterRule::new(Field::Status, Operator::Contains, "ACT");
        assert!(matches!(
            rule.validate(&registry),
            Err(BulkEditError::InvalidOperator { .. })
        ));
        let rule = FilterRule::new(Field::Price, Operator::Between, "1");
        assert!(matches!(rule.validate(&registry), Err(BulkEditError::MissingValue(_))));
    }

    #[test]
    fn test_inventory_filter() {
        let mut p = product("Tee", &["10", "10"]);
        p.variants[1].inventory_quantity = 5;
        assert!(check(&p, Field::InventoryQuantity, Operator::GreaterOrEqual, "5"));
        assert!(!check(&p, Field::InventoryQuantity, Operator::LessThan, "0"));
    }
}
