//! Newtype IDs for type-safe catalog and changeset references.
//!
//! Catalog entities are addressed by Shopify global IDs
//! (`gid://shopify/Product/123`). Use the `define_gid!` macro to create
//! wrappers that keep product and variant IDs from being mixed up.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to define a type-safe Shopify global ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `new()` which expands bare numeric IDs into a full GID
/// - `From<&str>`, `From<String>` and `Into<String>` implementations
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use batchwise_core::define_gid;
/// define_gid!(CollectionId, "Collection");
///
/// let id = CollectionId::new("42");
/// assert_eq!(id.as_str(), "gid://shopify/Collection/42");
/// assert_eq!(id.numeric_id(), "42");
/// ```
#[macro_export]
macro_rules! define_gid {
    ($name:ident, $resource:literal) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Shopify resource name used in the GID path.
            pub const RESOURCE: &'static str = $resource;

            /// Create an ID from a GID or a bare numeric ID.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                let id = id.into();
                if id.starts_with("gid://") {
                    Self(id)
                } else {
                    Self(format!("gid://shopify/{}/{}", $resource, id))
                }
            }

            /// Get the full GID.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Get the trailing numeric segment of the GID.
            #[must_use]
            pub fn numeric_id(&self) -> &str {
                self.0.rsplit('/').next().unwrap_or(&self.0)
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self::new(id)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <String as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <String as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_gid!(ProductId, "Product");
define_gid!(VariantId, "ProductVariant");

/// Identifier of a persisted changeset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
pub struct ChangesetId(Uuid);

impl ChangesetId {
    /// Generate a fresh random changeset ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for ChangesetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ChangesetId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}
