//! Wire types for the bulk-edit documents and their mapping onto the
//! engine's product snapshots and patches.

use batchwise_core::bulk::{ProductPatch, VariantPatch};
use batchwise_core::{Product, ProductId, ProductStatus, Variant, VariantId};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::warn;

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Deserialize)]
pub(super) struct ProductsData {
    pub products: ProductConnection,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProductData {
    pub product: Option<ProductNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ProductConnection {
    pub page_info: PageInfo,
    pub nodes: Vec<ProductNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ProductNode {
    id: String,
    title: String,
    #[serde(default)]
    handle: String,
    #[serde(default)]
    vendor: String,
    #[serde(default)]
    product_type: String,
    status: String,
    #[serde(default)]
    tags: Vec<String>,
    template_suffix: Option<String>,
    variants: VariantConnection,
}

#[derive(Debug, Deserialize)]
struct VariantConnection {
    nodes: Vec<VariantNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariantNode {
    id: String,
    #[serde(default)]
    title: String,
    price: String,
    compare_at_price: Option<String>,
    sku: Option<String>,
    barcode: Option<String>,
    inventory_quantity: Option<i64>,
    #[serde(default = "default_taxable")]
    taxable: bool,
    inventory_item: Option<InventoryItemNode>,
}

const fn default_taxable() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct InventoryItemNode {
    measurement: Option<MeasurementNode>,
}

#[derive(Debug, Deserialize)]
struct MeasurementNode {
    weight: Option<WeightNode>,
}

#[derive(Debug, Deserialize)]
struct WeightNode {
    unit: Option<String>,
    value: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ProductUpdateData {
    pub product_update: Option<MutationPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct VariantsBulkUpdateData {
    pub product_variants_bulk_update: Option<MutationPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MutationPayload {
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UserError {
    pub field: Option<Vec<String>>,
    pub message: String,
}

/// Render user errors as `field: message`.
pub(super) fn format_user_errors(errors: Vec<UserError>) -> Vec<String> {
    errors
        .into_iter()
        .map(|e| match e.field {
            Some(path) if !path.is_empty() => format!("{}: {}", path.join("."), e.message),
            _ => e.message,
        })
        .collect()
}

pub(super) fn convert_product(node: ProductNode) -> Product {
    let status = node.status.parse().unwrap_or_else(|_| {
        warn!(
            product_id = %node.id,
            status = %node.status,
            "Unknown product status, treating as draft"
        );
        ProductStatus::Draft
    });

    Product {
        id: ProductId::new(node.id),
        title: node.title,
        handle: node.handle,
        vendor: node.vendor,
        product_type: node.product_type,
        status,
        tags: node.tags,
        template_suffix: node.template_suffix.filter(|s| !s.is_empty()),
        variants: node.variants.nodes.into_iter().map(convert_variant).collect(),
    }
}

fn convert_variant(node: VariantNode) -> Variant {
    let weight_node = node
        .inventory_item
        .and_then(|item| item.measurement)
        .and_then(|m| m.weight);
    let weight = weight_node
        .as_ref()
        .and_then(|w| Decimal::try_from(w.value).ok())
        .map(|w| w.normalize());
    let weight_unit = weight_node.and_then(|w| w.unit).filter(|u| !u.is_empty());

    Variant {
        id: VariantId::new(node.id),
        title: node.title,
        price: node.price,
        compare_at_price: node.compare_at_price,
        sku: node.sku,
        barcode: node.barcode,
        weight,
        weight_unit,
        inventory_quantity: node.inventory_quantity.unwrap_or_default(),
        taxable: node.taxable,
    }
}

// =============================================================================
// Inputs
// =============================================================================

#[derive(Debug, Serialize)]
pub(super) struct ProductUpdateVariables {
    pub product: ProductUpdateInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ProductUpdateInput {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<String>>,
    /// `Some(None)` sends an explicit null, which resets the template.
    #[serde(skip_serializing_if = "Option::is_none")]
    template_suffix: Option<Option<String>>,
}

impl From<&ProductPatch> for ProductUpdateInput {
    fn from(patch: &ProductPatch) -> Self {
        Self {
            id: patch.id.as_str().to_string(),
            title: patch.title.clone(),
            vendor: patch.vendor.clone(),
            product_type: patch.product_type.clone(),
            status: patch.status.map(|s| s.as_str().to_string()),
            tags: patch.tags.clone(),
            template_suffix: patch
                .template_suffix
                .as_ref()
                .map(|s| (!s.is_empty()).then(|| s.clone())),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct VariantsBulkUpdateVariables {
    pub product_id: String,
    pub variants: Vec<VariantBulkInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct VariantBulkInput {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<String>,
    /// `Some(None)` clears the compare-at price.
    #[serde(skip_serializing_if = "Option::is_none")]
    compare_at_price: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    barcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    taxable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inventory_item: Option<InventoryItemInput>,
}

#[derive(Debug, Default, Serialize)]
struct InventoryItemInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    measurement: Option<MeasurementInput>,
}

#[derive(Debug, Serialize)]
struct MeasurementInput {
    weight: WeightInput,
}

#[derive(Debug, Serialize)]
struct WeightInput {
    unit: String,
    value: f64,
}

impl VariantBulkInput {
    /// `default_unit` is used only when the patch does not carry the
    /// variant's own weight unit.
    pub(super) fn from_patch(patch: &VariantPatch, default_unit: &str) -> Self {
        let measurement = patch.weight.and_then(|w| w.to_f64()).map(|value| MeasurementInput {
            weight: WeightInput {
                unit: patch.weight_unit.as_deref().unwrap_or(default_unit).to_string(),
                value,
            },
        });
        let inventory_item =
            (patch.sku.is_some() || measurement.is_some()).then(|| InventoryItemInput {
                sku: patch.sku.clone(),
                measurement,
            });

        Self {
            id: patch.id.as_str().to_string(),
            price: patch.price.clone(),
            compare_at_price: patch
                .compare_at_price
                .as_ref()
                .map(|s| (!s.is_empty()).then(|| s.clone())),
            barcode: patch.barcode.clone(),
            taxable: patch.taxable,
            inventory_item,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use batchwise_core::bulk::{ChangeType, ModSpec, ModSpecInput, plan};
    use batchwise_core::{Field, FieldRegistry};
    use serde_json::json;

    #[test]
    fn test_convert_product_reads_nested_weight() {
        let node: ProductNode = serde_json::from_value(json!({
            "id": "gid://shopify/Product/1",
            "title": "Tee",
            "handle": "tee",
            "vendor": "Acme",
            "productType": "Shirts",
            "status": "ACTIVE",
            "tags": ["sale"],
            "templateSuffix": "",
            "variants": {"nodes": [{
                "id": "gid://shopify/ProductVariant/10",
                "title": "Small",
                "price": "24.99",
                "compareAtPrice": null,
                "sku": "TEE-S",
                "barcode": null,
                "inventoryQuantity": 4,
                "taxable": false,
                "inventoryItem": {"measurement": {"weight": {"unit": "POUNDS", "value": 1.5}}}
            }]}
        }))
        .unwrap();

        let product = convert_product(node);
        assert_eq!(product.status, ProductStatus::Active);
        assert_eq!(product.template_suffix, None);
        let variant = &product.variants[0];
        assert_eq!(variant.weight, Some(Decimal::new(15, 1)));
        assert_eq!(variant.weight_unit.as_deref(), Some("POUNDS"));
        assert_eq!(variant.inventory_quantity, 4);
        assert!(!variant.taxable);
    }

    #[test]
    fn test_product_input_clears_template_with_null() {
        let mut patch = ProductPatch::new(ProductId::new("1"));
        patch.template_suffix = Some(String::new());
        patch.title = Some("Shirt".to_string());
        let value = serde_json::to_value(ProductUpdateInput::from(&patch)).unwrap();
        assert_eq!(
            value,
            json!({"id": "gid://shopify/Product/1", "title": "Shirt", "templateSuffix": null})
        );
    }

    #[test]
    fn test_variant_input_nests_sku_and_weight() {
        let mut patch = VariantPatch::new(VariantId::new("10"));
        patch.sku = Some("TEE-S".to_string());
        patch.weight = Some(Decimal::new(225, 2));
        patch.compare_at_price = Some(String::new());
        let value = serde_json::to_value(VariantBulkInput::from_patch(&patch, "GRAMS")).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "gid://shopify/ProductVariant/10",
                "compareAtPrice": null,
                "inventoryItem": {
                    "sku": "TEE-S",
                    "measurement": {"weight": {"unit": "GRAMS", "value": 2.25}}
                }
            })
        );
    }

    #[test]
    fn test_variant_input_keeps_variant_weight_unit() {
        let mut patch = VariantPatch::new(VariantId::new("10"));
        patch.weight = Some(Decimal::from(3));
        patch.weight_unit = Some("KILOGRAMS".to_string());
        let value = serde_json::to_value(VariantBulkInput::from_patch(&patch, "POUNDS")).unwrap();
        assert_eq!(
            value["inventoryItem"]["measurement"]["weight"],
            json!({"unit": "KILOGRAMS", "value": 3.0})
        );
    }

    #[test]
    fn test_kilogram_weight_round_trips_through_plan() {
        let node: ProductNode = serde_json::from_value(json!({
            "id": "gid://shopify/Product/2",
            "title": "Kettlebell",
            "status": "ACTIVE",
            "templateSuffix": null,
            "variants": {"nodes": [{
                "id": "gid://shopify/ProductVariant/20",
                "price": "40.00",
                "compareAtPrice": null,
                "sku": null,
                "barcode": null,
                "inventoryQuantity": 1,
                "inventoryItem": {"measurement": {"weight": {"unit": "KILOGRAMS", "value": 2}}}
            }]}
        }))
        .unwrap();
        let product = convert_product(node);

        let registry = FieldRegistry::standard();
        let specs = ModSpec::from_inputs(
            &[ModSpecInput::new(Field::Weight, ChangeType::IncreaseFixed, "1")],
            &registry,
        )
        .unwrap();
        let changeset = plan(std::iter::once(&product), &specs, &registry).unwrap();
        let change = changeset.get(0).unwrap();
        assert_eq!(change.new_value, "3");
        assert_eq!(change.weight_unit.as_deref(), Some("KILOGRAMS"));

        for change in [change.clone(), change.inverted()] {
            let mut patch = VariantPatch::new(VariantId::new("20"));
            assert!(patch.apply_change(&change));
            let input = VariantBulkInput::from_patch(&patch, "POUNDS");
            let value = serde_json::to_value(input).unwrap();
            assert_eq!(value["inventoryItem"]["measurement"]["weight"]["unit"], "KILOGRAMS");
        }
    }

    #[test]
    fn test_user_errors_are_prefixed_with_field() {
        let messages = format_user_errors(vec![
            UserError {
                field: Some(vec!["variants".to_string(), "0".to_string(), "price".to_string()]),
                message: "must be positive".to_string(),
            },
            UserError {
                field: None,
                message: "Product is locked".to_string(),
            },
        ]);
        assert_eq!(messages, vec!["variants.0.price: must be positive", "Product is locked"]);
    }
}
