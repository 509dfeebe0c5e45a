//! Value transformer.

use rust_decimal::{Decimal, RoundingStrategy};

use super::modification::{FieldOp, NumericChange, RoundingMode, TagOp, TextOp};
use crate::registry::FieldDescriptor;
use crate::types::product::{join_tags, split_tags};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Compute the new value of a field.
///
/// Returns `None` when the value cannot be computed (an unparseable current
/// number, or arithmetic overflow). Callers skip the field rather than fail.
/// Pure: identical inputs always give identical output.
#[must_use]
pub fn compute(current: &str, op: &FieldOp, descriptor: &FieldDescriptor) -> Option<String> {
    match op {
        FieldOp::Numeric {
            change,
            amount,
            rounding,
        } => compute_numeric(current, *change, *amount, *rounding, descriptor.money),
        FieldOp::Text(op) => Some(compute_text(current, op)),
        FieldOp::Tags(op) => Some(compute_tags(current, op)),
        FieldOp::Select(value) => Some(value.clone()),
    }
}

fn compute_numeric(
    current: &str,
    change: NumericChange,
    amount: Decimal,
    rounding: RoundingMode,
    money: bool,
) -> Option<String> {
    let current = match (change, current.trim()) {
        (NumericChange::Exact, _) | (_, "") => Decimal::ZERO,
        (_, raw) => raw.parse::<Decimal>().ok()?,
    };

    let value = match change {
        NumericChange::Exact => amount,
        NumericChange::IncreasePercent => current
            .checked_mul(HUNDRED.checked_add(amount)?)?
            .checked_div(HUNDRED)?,
        NumericChange::DecreasePercent => current
            .checked_mul(HUNDRED.checked_sub(amount)?)?
            .checked_div(HUNDRED)?,
        NumericChange::IncreaseFixed => current.checked_add(amount)?,
        NumericChange::DecreaseFixed => current.checked_sub(amount)?,
    };

    let value = match rounding {
        RoundingMode::None => value,
        RoundingMode::Round99 => value.floor().checked_add(Decimal::new(99, 2))?,
        RoundingMode::Round95 => value.floor().checked_add(Decimal::new(95, 2))?,
        RoundingMode::Whole => {
            value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        }
    };

    // Never negative. Also folds -0 into 0.
    let value = if value <= Decimal::ZERO { Decimal::ZERO } else { value };

    Some(if money {
        let mut value = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        value.rescale(2);
        value.to_string()
    } else {
        value.normalize().to_string()
    })
}

fn compute_text(current: &str, op: &TextOp) -> String {
    match op {
        TextOp::Set(value) => value.clone(),
        TextOp::Prepend(value) => format!("{value}{current}"),
        TextOp::Append(value) => format!("{current}{value}"),
        TextOp::FindReplace { find, replace } if !find.is_empty() => current.replace(find, replace),
        TextOp::FindReplace { .. } => current.to_string(),
    }
}

fn compute_tags(current: &str, op: &TagOp) -> String {
    let tags = match op {
        TagOp::Add(value) => {
            let mut tags = split_tags(current);
            for tag in split_tags(value) {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
            tags
        }
        TagOp::Remove(value) => {
            let remove: Vec<String> = split_tags(value).iter().map(|t| t.to_lowercase()).collect();
            split_tags(current)
                .into_iter()
                .filter(|tag| !remove.contains(&tag.to_lowercase()))
                .collect()
        }
        TagOp::Set(value) => split_tags(value),
    };
    join_tags(&tags)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::registry::{Field, FieldRegistry};

    fn numeric(change: NumericChange, amount: &str, rounding: RoundingMode) -> FieldOp {
        FieldOp::Numeric {
            change,
            amount: amount.parse().unwrap(),
            rounding,
        }
    }

    fn run(field: Field, current: &str, op: &FieldOp) -> Option<String> {
        let registry = FieldRegistry::standard();
        compute(current, op, registry.editable(field).unwrap())
    }

    #[test]
    fn test_price_rounding() {
        let plus5 = |r| numeric(NumericChange::IncreaseFixed, "5", r);
        assert_eq!(run(Field::Price, "19.50", &plus5(RoundingMode::Round99)).unwrap(), "24.99");
        assert_eq!(run(Field::Price, "19.50", &plus5(RoundingMode::Round95)).unwrap(), "24.95");
        assert_eq!(run(Field::Price, "19.50", &plus5(RoundingMode::Whole)).unwrap(), "25.00");
        assert_eq!(run(Field::Price, "19.50", &plus5(RoundingMode::None)).unwrap(), "24.50");
    }

    #[test]
    fn test_negative_results_clamp_to_zero() {
        let op = numeric(NumericChange::DecreaseFixed, "30", RoundingMode::None);
        assert_eq!(run(Field::Price, "19.50", &op).unwrap(), "0.00");
        assert_eq!(run(Field::Weight, "2.5", &op).unwrap(), "0");
    }

    #[test]
    fn test_percent_changes() {
        let up = numeric(NumericChange::IncreasePercent, "10", RoundingMode::None);
        let down = numeric(NumericChange::DecreasePercent, "25", RoundingMode::None);
        assert_eq!(run(Field::Price, "20.00", &up).unwrap(), "22.00");
        assert_eq!(run(Field::Price, "20.00", &down).unwrap(), "15.00");
        assert_eq!(run(Field::Price, "9.99", &up).unwrap(), "10.99");
    }

    #[test]
    fn test_blank_current_is_zero() {
        let op = numeric(NumericChange::IncreaseFixed, "4", RoundingMode::None);
        assert_eq!(run(Field::CompareAtPrice, "", &op).unwrap(), "4.00");
    }

    #[test]
    fn test_unparseable_current_cannot_compute() {
        let op = numeric(NumericChange::IncreaseFixed, "4", RoundingMode::None);
        assert_eq!(run(Field::Price, "n/a", &op), None);
        let exact = numeric(NumericChange::Exact, "4", RoundingMode::None);
        assert_eq!(run(Field::Price, "n/a", &exact).unwrap(), "4.00");
    }

    #[test]
    fn test_weight_uses_minimal_representation() {
        let op = numeric(NumericChange::IncreaseFixed, "0.25", RoundingMode::None);
        assert_eq!(run(Field::Weight, "1.25", &op).unwrap(), "1.5");
        assert_eq!(run(Field::Weight, "1.75", &op).unwrap(), "2");
    }

    #[test]
    fn test_text_operations() {
        let set = FieldOp::Text(TextOp::Set("New".to_string()));
        let prepend = FieldOp::Text(TextOp::Prepend("[Sale] ".to_string()));
        let append = FieldOp::Text(TextOp::Append(" - Final".to_string()));
        let replace = FieldOp::Text(TextOp::FindReplace {
            find: "a".to_string(),
            replace: String::new(),
        });
        assert_eq!(run(Field::Title, "Old", &set).unwrap(), "New");
        assert_eq!(run(Field::Title, "Tee", &prepend).unwrap(), "[Sale] Tee");
        assert_eq!(run(Field::Title, "Tee", &append).unwrap(), "Tee - Final");
        assert_eq!(run(Field::Title, "banana", &replace).unwrap(), "bnn");
    }

    #[test]
    fn test_find_replace_is_literal() {
        let op = FieldOp::Text(TextOp::FindReplace {
            find: ".*".to_string(),
            replace: "x".to_string(),
        });
        assert_eq!(run(Field::Title, "a.*b.*", &op).unwrap(), "axbx");
    }

    #[test]
    fn test_tag_remove_is_case_insensitive() {
        let op = FieldOp::Tags(TagOp::Remove("Sale".to_string()));
        assert_eq!(run(Field::Tags, "sale, clearance", &op).unwrap(), "clearance");
    }

    #[test]
    fn test_tag_add_is_case_sensitive_union() {
        let op = FieldOp::Tags(TagOp::Add("new, sale, Sale".to_string()));
        assert_eq!(run(Field::Tags, "sale, clearance", &op).unwrap(), "sale, clearance, new, Sale");
    }

    #[test]
    fn test_tag_set_replaces() {
        let op = FieldOp::Tags(TagOp::Set(" a ,b,a".to_string()));
        assert_eq!(run(Field::Tags, "x", &op).unwrap(), "a, b");
    }

    #[test]
    fn test_select_passes_through() {
        let op = FieldOp::Select("ARCHIVED".to_string());
        assert_eq!(run(Field::Status, "ACTIVE", &op).unwrap(), "ARCHIVED");
    }

    #[test]
    fn test_compute_is_deterministic() {
        let op = numeric(NumericChange::IncreasePercent, "12.5", RoundingMode::Round99);
        let first = run(Field::Price, "13.37", &op);
        assert_eq!(first, run(Field::Price, "13.37", &op));
    }
}
