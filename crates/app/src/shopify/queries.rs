//! GraphQL documents sent to the Admin API.
//!
//! Every document carries exactly the fields the bulk-edit field registry
//! reads or writes.

/// Product fields shared by both reads.
macro_rules! product_fragment {
    () => {
        r"
fragment BulkEditProduct on Product {
  id
  title
  handle
  vendor
  productType
  status
  tags
  templateSuffix
  variants(first: 100) {
    nodes {
      id
      title
      price
      compareAtPrice
      sku
      barcode
      inventoryQuantity
      taxable
      inventoryItem {
        measurement {
          weight {
            unit
            value
          }
        }
      }
    }
  }
}
"
    };
}

/// One page of products with their variants.
pub const GET_PRODUCTS: &str = concat!(
    r"
query GetProducts($first: Int!, $after: String, $query: String) {
  products(first: $first, after: $after, query: $query) {
    pageInfo {
      hasNextPage
      endCursor
    }
    nodes {
      ...BulkEditProduct
    }
  }
}
",
    product_fragment!()
);

/// A single product by GID.
pub const GET_PRODUCT: &str = concat!(
    r"
query GetProduct($id: ID!) {
  product(id: $id) {
    ...BulkEditProduct
  }
}
",
    product_fragment!()
);

/// Write product-level fields.
pub const PRODUCT_UPDATE: &str = r"
mutation ProductUpdate($product: ProductUpdateInput!) {
  productUpdate(product: $product) {
    product {
      id
    }
    userErrors {
      field
      message
    }
  }
}
";

/// Write variant-level fields for several variants of one product.
pub const PRODUCT_VARIANTS_BULK_UPDATE: &str = r"
mutation ProductVariantsBulkUpdate($productId: ID!, $variants: [ProductVariantsBulkInput!]!) {
  productVariantsBulkUpdate(productId: $productId, variants: $variants) {
    productVariants {
      id
    }
    userErrors {
      field
      message
    }
  }
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_include_fragment() {
        for query in [GET_PRODUCTS, GET_PRODUCT] {
            assert!(query.contains("...BulkEditProduct"));
            assert!(query.contains("fragment BulkEditProduct on Product"));
        }
    }

    #[test]
    fn test_mutations_request_user_errors() {
        for mutation in [PRODUCT_UPDATE, PRODUCT_VARIANTS_BULK_UPDATE] {
            assert!(mutation.contains("userErrors"));
        }
    }
}
