//! Field registries.
//!
//! A [`FieldRegistry`] holds two closed tables keyed by [`Field`]:
//!
//! - editable fields, with a category that decides which change types apply
//!   and an accessor that reads the current value off a product or variant
//! - filterable fields, with a comparison type that decides which operators
//!   apply (this includes read-only attributes like inventory quantity)
//!
//! One registry value is built at start-up and passed to everything that
//! needs it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BulkEditError;
use crate::types::{Product, Variant};

/// Every attribute the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Title,
    Vendor,
    ProductType,
    Handle,
    Status,
    Tags,
    TemplateSuffix,
    Price,
    CompareAtPrice,
    Sku,
    Barcode,
    Weight,
    Taxable,
    InventoryQuantity,
    VariantTitle,
}

impl Field {
    /// Wire name of the field.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Vendor => "vendor",
            Self::ProductType => "productType",
            Self::Handle => "handle",
            Self::Status => "status",
            Self::Tags => "tags",
            Self::TemplateSuffix => "templateSuffix",
            Self::Price => "price",
            Self::CompareAtPrice => "compareAtPrice",
            Self::Sku => "sku",
            Self::Barcode => "barcode",
            Self::Weight => "weight",
            Self::Taxable => "taxable",
            Self::InventoryQuantity => "inventoryQuantity",
            Self::VariantTitle => "variantTitle",
        }
    }

    const ALL: [Self; 15] = [
        Self::Title,
        Self::Vendor,
        Self::ProductType,
        Self::Handle,
        Self::Status,
        Self::Tags,
        Self::TemplateSuffix,
        Self::Price,
        Self::CompareAtPrice,
        Self::Sku,
        Self::Barcode,
        Self::Weight,
        Self::Taxable,
        Self::InventoryQuantity,
        Self::VariantTitle,
    ];
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = BulkEditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| BulkEditError::UnknownField(s.to_string()))
    }
}

/// Display category of an editable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    Numeric,
    Text,
    Tags,
    Select,
}

/// Which catalog object owns a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldLevel {
    /// Owned by the product.
    Product,
    /// Owned by each variant.
    Variant,
}

/// How a filterable field is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonType {
    Text,
    Number,
    Select,
}

/// Reads a field's current value as a string.
///
/// The variant decides the field's [`FieldLevel`].
#[derive(Clone, Copy)]
pub enum Accessor {
    Product(fn(&Product) -> String),
    Variant(fn(&Variant) -> String),
}

impl Accessor {
    /// Ownership level implied by this accessor.
    #[must_use]
    pub const fn level(&self) -> FieldLevel {
        match self {
            Self::Product(_) => FieldLevel::Product,
            Self::Variant(_) => FieldLevel::Variant,
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Product(_) => f.write_str("Accessor::Product"),
            Self::Variant(_) => f.write_str("Accessor::Variant"),
        }
    }
}

/// Static metadata for one editable field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub field: Field,
    pub label: &'static str,
    pub category: FieldCategory,
    pub accessor: Accessor,
    /// Allowed values for select fields.
    pub options: &'static [&'static str],
    /// Money-like numeric field: two-decimal formatting and rounding modes.
    pub money: bool,
}

impl FieldDescriptor {
    #[must_use]
    pub const fn level(&self) -> FieldLevel {
        self.accessor.level()
    }
}

/// Static metadata for one filterable field.
#[derive(Debug, Clone)]
pub struct FilterFieldDescriptor {
    pub field: Field,
    pub label: &'static str,
    pub comparison: ComparisonType,
    pub accessor: Accessor,
}

impl FilterFieldDescriptor {
    #[must_use]
    pub const fn level(&self) -> FieldLevel {
        self.accessor.level()
    }
}

/// The closed set of editable and filterable fields.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    editable: Vec<FieldDescriptor>,
    filterable: Vec<FilterFieldDescriptor>,
}

const STATUS_OPTIONS: &[&str] = &["ACTIVE", "DRAFT", "ARCHIVED"];
const TAXABLE_OPTIONS: &[&str] = &["true", "false"];

fn weight_string(variant: &Variant) -> String {
    variant
        .weight
        .map_or_else(|| "0".to_string(), |w| w.normalize().to_string())
}

impl FieldRegistry {
    /// Build a registry from explicit tables.
    #[must_use]
    pub const fn new(
        editable: Vec<FieldDescriptor>,
        filterable: Vec<FilterFieldDescriptor>,
    ) -> Self {
        Self {
            editable,
            filterable,
        }
    }

    /// The canonical registry used by both the wizard and automations.
    #[must_use]
    pub fn standard() -> Self {
        use Accessor::{Product as P, Variant as V};

        let editable = vec![
            editable(Field::Title, "Title", FieldCategory::Text, P(|p| p.title.clone())),
            editable(Field::Vendor, "Vendor", FieldCategory::Text, P(|p| p.vendor.clone())),
            editable(
                Field::ProductType,
                "Product Type",
                FieldCategory::Text,
                P(|p| p.product_type.clone()),
            ),
            FieldDescriptor {
                options: STATUS_OPTIONS,
                ..editable(
                    Field::Status,
                    "Status",
                    FieldCategory::Select,
                    P(|p| p.status.as_str().to_string()),
                )
            },
            editable(Field::Tags, "Tags", FieldCategory::Tags, P(Product::tags_string)),
            editable(
                Field::TemplateSuffix,
                "Product Template",
                FieldCategory::Text,
                P(|p| p.template_suffix.clone().unwrap_or_default()),
            ),
            FieldDescriptor {
                money: true,
                ..editable(Field::Price, "Price", FieldCategory::Numeric, V(|v| v.price.clone()))
            },
            FieldDescriptor {
                money: true,
                ..editable(
                    Field::CompareAtPrice,
                    "Compare-at Price",
                    FieldCategory::Numeric,
                    V(|v| v.compare_at_price.clone().unwrap_or_default()),
                )
            },
            editable(
                Field::Sku,
                "SKU",
                FieldCategory::Text,
                V(|v| v.sku.clone().unwrap_or_default()),
            ),
            editable(
                Field::Barcode,
                "Barcode",
                FieldCategory::Text,
                V(|v| v.barcode.clone().unwrap_or_default()),
            ),
            editable(Field::Weight, "Weight", FieldCategory::Numeric, V(weight_string)),
            FieldDescriptor {
                options: TAXABLE_OPTIONS,
                ..editable(
                    Field::Taxable,
                    "Taxable",
                    FieldCategory::Select,
                    V(|v| v.taxable.to_string()),
                )
            },
        ];

        let filterable = vec![
            filterable(Field::Title, "Title", ComparisonType::Text, P(|p| p.title.clone())),
            filterable(Field::Vendor, "Vendor", ComparisonType::Text, P(|p| p.vendor.clone())),
            filterable(
                Field::ProductType,
                "Product Type",
                ComparisonType::Text,
                P(|p| p.product_type.clone()),
            ),
            filterable(Field::Handle, "Handle", ComparisonType::Text, P(|p| p.handle.clone())),
            filterable(
                Field::Status,
                "Status",
                ComparisonType::Select,
                P(|p| p.status.as_str().to_string()),
            ),
            filterable(Field::Tags, "Tags", ComparisonType::Text, P(Product::tags_string)),
            filterable(
                Field::TemplateSuffix,
                "Product Template",
                ComparisonType::Text,
                P(|p| p.template_suffix.clone().unwrap_or_default()),
            ),
            filterable(Field::Price, "Price", ComparisonType::Number, V(|v| v.price.clone())),
            filterable(
                Field::CompareAtPrice,
                "Compare-at Price",
                ComparisonType::Number,
                V(|v| v.compare_at_price.clone().unwrap_or_default()),
            ),
            filterable(
                Field::Sku,
                "SKU",
                ComparisonType::Text,
                V(|v| v.sku.clone().unwrap_or_default()),
            ),
            filterable(
                Field::Barcode,
                "Barcode",
                ComparisonType::Text,
                V(|v| v.barcode.clone().unwrap_or_default()),
            ),
            filterable(
                Field::VariantTitle,
                "Variant Title",
                ComparisonType::Text,
                P(Product::variant_titles_string),
            ),
            filterable(
                Field::InventoryQuantity,
                "Inventory",
                ComparisonType::Number,
                V(|v| v.inventory_quantity.to_string()),
            ),
            filterable(Field::Weight, "Weight", ComparisonType::Number, V(weight_string)),
        ];

        Self::new(editable, filterable)
    }

    /// Look up an editable field.
    ///
    /// # Errors
    ///
    /// Returns `BulkEditError::FieldNotEditable` if the field is not in the
    /// editable table.
    pub fn editable(&self, field: Field) -> Result<&FieldDescriptor, BulkEditError> {
        self.editable
            .iter()
            .find(|d| d.field == field)
            .ok_or(BulkEditError::FieldNotEditable(field))
    }

    /// Look up a filterable field.
    ///
    /// # Errors
    ///
    /// Returns `BulkEditError::FieldNotFilterable` if the field is not in the
    /// filterable table.
    pub fn filterable(&self, field: Field) -> Result<&FilterFieldDescriptor, BulkEditError> {
        self.filterable
            .iter()
            .find(|d| d.field == field)
            .ok_or(BulkEditError::FieldNotFilterable(field))
    }

    /// All editable fields in display order.
    pub fn editable_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.editable.iter()
    }

    /// All filterable fields in display order.
    pub fn filterable_fields(&self) -> impl Iterator<Item = &FilterFieldDescriptor> {
        self.filterable.iter()
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

const fn editable(
    field: Field,
    label: &'static str,
    category: FieldCategory,
    accessor: Accessor,
) -> FieldDescriptor {
    FieldDescriptor {
        field,
        label,
        category,
        accessor,
        options: &[],
        money: false,
    }
}

const fn filterable(
    field: Field,
    label: &'static str,
    comparison: ComparisonType,
    accessor: Accessor,
) -> FilterFieldDescriptor {
    FilterFieldDescriptor {
        field,
        label,
        comparison,
        accessor,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(field.as_str().parse::<Field>().unwrap(), field);
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.as_str()));
        }
    }

    #[test]
    fn test_unknown_field_name() {
        assert_eq!(
            "colour".parse::<Field>(),
            Err(BulkEditError::UnknownField("colour".to_string()))
        );
    }

    #[test]
    fn test_inventory_is_filterable_but_not_editable() {
        let registry = FieldRegistry::standard();
        assert!(registry.filterable(Field::InventoryQuantity).is_ok());
        assert_eq!(
            registry.editable(Field::InventoryQuantity).unwrap_err(),
            BulkEditError::FieldNotEditable(Field::InventoryQuantity)
        );
    }

    #[test]
    fn test_levels_follow_accessors() {
        let registry = FieldRegistry::standard();
        assert_eq!(registry.editable(Field::Tags).unwrap().level(), FieldLevel::Product);
        assert_eq!(registry.editable(Field::Weight).unwrap().level(), FieldLevel::Variant);
        assert_eq!(registry.filterable(Field::Price).unwrap().level(), FieldLevel::Variant);
        assert_eq!(
            registry.filterable(Field::VariantTitle).unwrap().level(),
            FieldLevel::Product
        );
    }

    #[test]
    fn test_only_prices_are_money() {
        let registry = FieldRegistry::standard();
        let money: Vec<Field> = registry
            .editable_fields()
            .filter(|d| d.money)
            .map(|d| d.field)
            .collect();
        assert_eq!(money, vec![Field::Price, Field::CompareAtPrice]);
    }
}
