//! Transient product snapshots.
//!
//! The engine never owns catalog storage. These types hold what one
//! planning/execution pass read from the catalog, and nothing else.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ProductId, ProductStatus, VariantId};
use crate::registry::Field;

/// Separator used when tags are flattened to a single string.
pub const TAG_SEPARATOR: &str = ", ";

/// A catalog product with its variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product GID.
    pub id: ProductId,
    /// Product title.
    pub title: String,
    /// URL handle.
    #[serde(default)]
    pub handle: String,
    /// Vendor name.
    #[serde(default)]
    pub vendor: String,
    /// Product type.
    #[serde(default)]
    pub product_type: String,
    /// Publication status.
    #[serde(default)]
    pub status: ProductStatus,
    /// Tags in catalog order.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Theme template suffix ("Product Template").
    #[serde(default)]
    pub template_suffix: Option<String>,
    /// Variants in catalog order.
    #[serde(default)]
    pub variants: Vec<Variant>,
}

/// A product variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    /// Variant GID.
    pub id: VariantId,
    /// Variant title (combination of option values).
    #[serde(default)]
    pub title: String,
    /// Price as a decimal string.
    #[serde(default)]
    pub price: String,
    /// Compare-at price as a decimal string.
    #[serde(default)]
    pub compare_at_price: Option<String>,
    /// SKU code.
    #[serde(default)]
    pub sku: Option<String>,
    /// Barcode.
    #[serde(default)]
    pub barcode: Option<String>,
    /// Shipping weight.
    #[serde(default)]
    pub weight: Option<Decimal>,
    /// Unit of `weight` as the catalog reports it, e.g. `KILOGRAMS`.
    #[serde(default)]
    pub weight_unit: Option<String>,
    /// Inventory quantity across all locations (read-only).
    #[serde(default)]
    pub inventory_quantity: i64,
    /// Whether the variant is taxable.
    #[serde(default = "default_taxable")]
    pub taxable: bool,
}

const fn default_taxable() -> bool {
    true
}

/// Split a comma-separated tag string into trimmed, deduplicated tags.
///
/// Identity is case-sensitive; the first occurrence wins.
#[must_use]
pub fn split_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|existing| existing == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Join tags into the flattened form used for comparison and storage.
#[must_use]
pub fn join_tags(tags: &[String]) -> String {
    tags.join(TAG_SEPARATOR)
}

impl Product {
    /// Tags flattened to a comma-joined string.
    #[must_use]
    pub fn tags_string(&self) -> String {
        join_tags(&self.tags)
    }

    /// Every variant title, joined with `", "` in catalog order.
    #[must_use]
    pub fn variant_titles_string(&self) -> String {
        self.variants
            .iter()
            .map(|v| v.title.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Look up a variant by ID.
    #[must_use]
    pub fn variant(&self, id: &VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| &v.id == id)
    }

    /// Write a value into this snapshot.
    ///
    /// `variant_id` is required for variant-owned fields. Returns `false` when
    /// the field is read-only, the variant is unknown, or the value does not
    /// parse for the field.
    pub fn set_field(&mut self, field: Field, variant_id: Option<&VariantId>, value: &str) -> bool {
        match field {
            Field::Title => self.title = value.to_string(),
            Field::Vendor => self.vendor = value.to_string(),
            Field::ProductType => self.product_type = value.to_string(),
            Field::Handle => self.handle = value.to_string(),
            Field::TemplateSuffix => {
                self.template_suffix = (!value.is_empty()).then(|| value.to_string());
            }
            Field::Status => match value.parse() {
                Ok(status) => self.status = status,
                Err(_) => return false,
            },
            Field::Tags => self.tags = split_tags(value),
            Field::Price
            | Field::CompareAtPrice
            | Field::Sku
            | Field::Barcode
            | Field::Weight
            | Field::Taxable => {
                let Some(variant) = variant_id
                    .and_then(|id| self.variants.iter_mut().find(|v| &v.id == id))
                else {
                    return false;
                };
                return variant.set_field(field, value);
            }
            Field::InventoryQuantity | Field::VariantTitle => return false,
        }
        true
    }
}

impl Variant {
    /// Write a variant-owned value. See [`Product::set_field`].
    pub fn set_field(&mut self, field: Field, value: &str) -> bool {
        match field {
            Field::Price => self.price = value.to_string(),
            Field::CompareAtPrice => {
                self.compare_at_price = (!value.is_empty()).then(|| value.to_string());
            }
            Field::Sku => self.sku = Some(value.to_string()),
            Field::Barcode => self.barcode = Some(value.to_string()),
            Field::Weight => match value.trim().parse::<Decimal>() {
                Ok(weight) => self.weight = Some(weight),
                Err(_) => return false,
            },
            Field::Taxable => match value.trim().to_lowercase().as_str() {
                "true" => self.taxable = true,
                "false" => self.taxable = false,
                _ => return false,
            },
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product() -> Product {
        Product {
            id: ProductId::new("1"),
            title: "Tee".to_string(),
            handle: "tee".to_string(),
            vendor: "Acme".to_string(),
            product_type: "Shirts".to_string(),
            status: ProductStatus::Active,
            tags: vec!["sale".to_string()],
            template_suffix: None,
            variants: vec![Variant {
                id: VariantId::new("10"),
                title: "Small".to_string(),
                price: "10.00".to_string(),
                compare_at_price: None,
                sku: Some("TEE-S".to_string()),
                barcode: None,
                weight: None,
                weight_unit: None,
                inventory_quantity: 3,
                taxable: true,
            }],
        }
    }

    #[test]
    fn test_split_tags_trims_and_dedupes() {
        assert_eq!(
            split_tags(" sale, clearance ,sale,, Sale"),
            vec!["sale", "clearance", "Sale"]
        );
    }

    #[test]
    fn test_set_variant_field_requires_known_variant() {
        let mut p = product();
        assert!(!p.set_field(Field::Price, None, "5.00"));
        assert!(!p.set_field(Field::Price, Some(&VariantId::new("99")), "5.00"));
        assert!(p.set_field(Field::Price, Some(&VariantId::new("10")), "5.00"));
        assert_eq!(p.variants[0].price, "5.00");
    }

    #[test]
    fn test_set_status_rejects_unknown_value() {
        let mut p = product();
        assert!(!p.set_field(Field::Status, None, "DELETED"));
        assert!(p.set_field(Field::Status, None, "DRAFT"));
        assert_eq!(p.status, ProductStatus::Draft);
    }

    #[test]
    fn test_read_only_fields_are_rejected() {
        let mut p = product();
        let variant = VariantId::new("10");
        assert!(!p.set_field(Field::InventoryQuantity, Some(&variant), "4"));
        assert_eq!(p.variants[0].inventory_quantity, 3);
    }

    #[test]
    fn test_empty_template_suffix_clears() {
        let mut p = product();
        p.set_field(Field::TemplateSuffix, None, "alternate");
        assert_eq!(p.template_suffix.as_deref(), Some("alternate"));
        p.set_field(Field::TemplateSuffix, None, "");
        assert_eq!(p.template_suffix, None);
    }
}
