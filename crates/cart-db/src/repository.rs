//! Durable cart records and the repository contract.

use crate::DbError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Cart key used when a scope does not name one.
pub const DEFAULT_CART_KEY: &str = "cart_items";

/// Whose durable cart a repository call addresses.
///
/// An authenticated owner takes precedence; anonymous shoppers are tracked by
/// their session identifier alone. Each named cart of an owner or session
/// has its own record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartScope {
    /// Authenticated owner, if any.
    pub owner_id: Option<String>,
    /// Current session identifier.
    pub session_id: String,
    /// Named cart within the owner or session.
    pub cart_key: String,
}

impl CartScope {
    /// Scope for an anonymous session.
    pub fn anonymous(session_id: impl Into<String>) -> Self {
        Self {
            owner_id: None,
            session_id: session_id.into(),
            cart_key: DEFAULT_CART_KEY.to_string(),
        }
    }

    /// Scope for a signed-in owner.
    pub fn owner(owner_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
            session_id: session_id.into(),
            cart_key: DEFAULT_CART_KEY.to_string(),
        }
    }

    /// Same owner and session, addressing another named cart.
    pub fn with_cart_key(mut self, cart_key: impl Into<String>) -> Self {
        self.cart_key = cart_key.into();
        self
    }
}

/// The cart-level durable record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartRecord {
    /// Record identifier.
    pub id: i64,
    /// Owner the cart belongs to, once known.
    pub user_id: Option<String>,
    /// Session that last touched the cart.
    pub session_id: String,
    /// Named cart the record holds.
    pub cart_key: String,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last change.
    pub updated_at: i64,
}

/// One durable line row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartRow {
    /// Identity hash the row was written under.
    pub row_id: String,
    /// External product reference.
    pub product_id: String,
    /// Display label.
    pub name: String,
    /// Unit price before tax.
    pub unit_price: f64,
    /// Quantity.
    pub quantity: f64,
    /// Option payload as a JSON object.
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// A cart record together with its rows.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCart {
    /// The cart-level record.
    pub record: CartRecord,
    /// Its rows, in insertion order.
    pub rows: Vec<CartRow>,
}

/// Durable storage for carts.
///
/// Implementations only need to be correct for a single writer per cart;
/// concurrent writers follow last-write-wins.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Find the record for `scope`, creating it if missing.
    ///
    /// An owner scope matches on `user_id`, an anonymous scope on
    /// `session_id`; both also match on `cart_key`. The returned record is stamped with the scope's session
    /// and, when present, its owner.
    async fn find_or_create(&self, scope: &CartScope) -> Result<CartRecord, DbError>;

    /// Insert or replace the row keyed by `(cart_id, row_id, product_id)`.
    async fn upsert_row(&self, cart_id: i64, row: &CartRow) -> Result<(), DbError>;

    /// Update the row with `row.row_id` in place.
    ///
    /// Fails with [`DbError::NotFound`] if no such row exists.
    async fn update_row(&self, cart_id: i64, row: &CartRow) -> Result<(), DbError>;

    /// Delete the row with `row_id`. Deleting a missing row is not an error.
    async fn delete_row(&self, cart_id: i64, row_id: &str) -> Result<(), DbError>;

    /// Number of rows held by the record.
    async fn count_rows(&self, cart_id: i64) -> Result<u64, DbError>;

    /// Refresh the record's `updated_at`.
    async fn touch(&self, cart_id: i64) -> Result<(), DbError>;

    /// Delete the record and all of its rows.
    async fn delete_record(&self, cart_id: i64) -> Result<(), DbError>;

    /// Load the owner's record for `cart_key` with its rows.
    async fn find_by_owner(
        &self,
        owner_id: &str,
        cart_key: &str,
    ) -> Result<Option<StoredCart>, DbError>;
}

/// Get current Unix timestamp.
pub(crate) fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
