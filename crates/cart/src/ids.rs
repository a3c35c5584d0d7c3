//! Newtype IDs for type-safe identifiers.
//!
//! A [`RowId`] is derived from a product and its options, so the same
//! product with different options occupies different cart rows.

use crate::cart::OptionSet;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Bytes of the SHA-256 digest kept in a row id.
const ROW_ID_BYTES: usize = 16;

/// Macro to generate newtype ID structs.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an ID from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<&$name> for $name {
            fn from(id: &$name) -> Self {
                id.clone()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Opaque product identifier supplied by the caller.
    ProductId
);
define_id!(
    /// Identity of a cart row, derived from product and options.
    RowId
);

impl RowId {
    /// Derive the row id for a product and option set.
    ///
    /// Options are hashed in key order, so insertion order does not matter.
    /// The result is 32 lowercase hex characters.
    pub fn derive(product_id: &ProductId, options: &OptionSet) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(product_id.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(options.canonical_bytes());
        let digest = hasher.finalize();
        Self(hex::encode(&digest[..ROW_ID_BYTES]))
    }
}
