//! [`Catalog`] port backed by the Admin API.

use async_trait::async_trait;
use batchwise_core::bulk::{ProductPatch, VariantPatch};
use batchwise_core::ports::{Catalog, MutationOutcome};
use batchwise_core::{CatalogError, Product, ProductId};
use serde_json::json;
use tracing::{debug, instrument};

use super::conversions::{
    ProductData, ProductUpdateData, ProductUpdateInput, ProductUpdateVariables, ProductsData,
    VariantBulkInput, VariantsBulkUpdateData, VariantsBulkUpdateVariables, convert_product,
    format_user_errors,
};
use super::{AdminClient, AdminShopifyError, queries};

#[async_trait]
impl Catalog for AdminClient {
    /// Walks every page of the connection before returning.
    #[instrument(skip(self))]
    async fn fetch_products(&self, query: Option<&str>) -> Result<Vec<Product>, CatalogError> {
        let mut products = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let variables = json!({
                "first": self.page_size(),
                "after": after,
                "query": query,
            });
            let data: ProductsData = self
                .execute("GetProducts", queries::GET_PRODUCTS, variables)
                .await?;

            products.extend(data.products.nodes.into_iter().map(convert_product));

            match data.products.page_info.end_cursor {
                Some(cursor) if data.products.page_info.has_next_page => after = Some(cursor),
                _ => break,
            }
        }

        debug!(count = products.len(), "Fetched catalog products");
        Ok(products)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        let data: ProductData = self
            .execute("GetProduct", queries::GET_PRODUCT, json!({ "id": id.as_str() }))
            .await?;
        Ok(data.product.map(convert_product))
    }

    #[instrument(skip(self, patch), fields(product_id = %patch.id))]
    async fn update_product(&self, patch: &ProductPatch) -> Result<MutationOutcome, CatalogError> {
        let variables = ProductUpdateVariables {
            product: ProductUpdateInput::from(patch),
        };
        let data: ProductUpdateData = self
            .execute("ProductUpdate", queries::PRODUCT_UPDATE, variables)
            .await?;

        let payload = data.product_update.ok_or_else(|| {
            AdminShopifyError::UserError("productUpdate returned no payload".to_string())
        })?;
        Ok(outcome(format_user_errors(payload.user_errors)))
    }

    #[instrument(skip(self, patches), fields(product_id = %product_id, variants = patches.len()))]
    async fn update_variants(
        &self,
        product_id: &ProductId,
        patches: &[VariantPatch],
    ) -> Result<MutationOutcome, CatalogError> {
        let variables = VariantsBulkUpdateVariables {
            product_id: product_id.as_str().to_string(),
            variants: patches
                .iter()
                .map(|patch| VariantBulkInput::from_patch(patch, self.weight_unit()))
                .collect(),
        };
        let data: VariantsBulkUpdateData = self
            .execute(
                "ProductVariantsBulkUpdate",
                queries::PRODUCT_VARIANTS_BULK_UPDATE,
                variables,
            )
            .await?;

        let payload = data.product_variants_bulk_update.ok_or_else(|| {
            AdminShopifyError::UserError(
                "productVariantsBulkUpdate returned no payload".to_string(),
            )
        })?;
        Ok(outcome(format_user_errors(payload.user_errors)))
    }
}

fn outcome(user_errors: Vec<String>) -> MutationOutcome {
    if user_errors.is_empty() {
        MutationOutcome::applied()
    } else {
        MutationOutcome::rejected(user_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_user_errors() {
        assert!(outcome(vec![]).is_applied());
        let rejected = outcome(vec!["price: must be positive".to_string()]);
        assert!(!rejected.is_applied());
        assert_eq!(rejected.user_errors, vec!["price: must be positive"]);
    }
}
