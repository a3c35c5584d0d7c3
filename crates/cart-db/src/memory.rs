//! In-memory cart repository for tests and development.

use crate::repository::current_timestamp;
use crate::{CartRecord, CartRepository, CartRow, CartScope, DbError, StoredCart};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    carts: Vec<CartRecord>,
    rows: Vec<(i64, CartRow)>,
}

impl MemoryState {
    fn find(&self, scope: &CartScope) -> Option<usize> {
        self.carts.iter().position(|c| {
            c.cart_key == scope.cart_key
                && match &scope.owner_id {
                    Some(owner) => c.user_id.as_deref() == Some(owner.as_str()),
                    None => c.session_id == scope.session_id,
                }
        })
    }
}

/// Repository holding records in process memory.
///
/// Follows the same matching rules as the SQLite repository.
#[derive(Debug, Default)]
pub struct MemoryCartRepository {
    state: Mutex<MemoryState>,
}

impl MemoryCartRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all cart records.
    pub fn records(&self) -> Vec<CartRecord> {
        self.state
            .lock()
            .map(|s| s.carts.clone())
            .unwrap_or_default()
    }

    /// Snapshot of the rows of one record.
    pub fn rows(&self, cart_id: i64) -> Vec<CartRow> {
        self.state
            .lock()
            .map(|s| {
                s.rows
                    .iter()
                    .filter(|(id, _)| *id == cart_id)
                    .map(|(_, row)| row.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, DbError> {
        self.state
            .lock()
            .map_err(|_| DbError::OpenError("memory repository lock poisoned".to_string()))
    }
}

#[async_trait]
impl CartRepository for MemoryCartRepository {
    async fn find_or_create(&self, scope: &CartScope) -> Result<CartRecord, DbError> {
        let mut state = self.lock()?;
        let now = current_timestamp();
        let index = match state.find(scope) {
            Some(index) => index,
            None => {
                state.next_id += 1;
                let id = state.next_id;
                state.carts.push(CartRecord {
                    id,
                    user_id: None,
                    session_id: scope.session_id.clone(),
                    cart_key: scope.cart_key.clone(),
                    created_at: now,
                    updated_at: now,
                });
                state.carts.len() - 1
            }
        };

        let record = &mut state.carts[index];
        if scope.owner_id.is_some() {
            record.user_id = scope.owner_id.clone();
        }
        record.session_id = scope.session_id.clone();
        record.updated_at = now;
        Ok(record.clone())
    }

    async fn upsert_row(&self, cart_id: i64, row: &CartRow) -> Result<(), DbError> {
        let mut state = self.lock()?;
        let existing = state.rows.iter_mut().find(|(id, r)| {
            *id == cart_id && r.row_id == row.row_id && r.product_id == row.product_id
        });
        match existing {
            Some((_, stored)) => *stored = row.clone(),
            None => state.rows.push((cart_id, row.clone())),
        }
        Ok(())
    }

    async fn update_row(&self, cart_id: i64, row: &CartRow) -> Result<(), DbError> {
        let mut state = self.lock()?;
        let (_, stored) = state
            .rows
            .iter_mut()
            .find(|(id, r)| *id == cart_id && r.row_id == row.row_id)
            .ok_or(DbError::NotFound)?;
        stored.name = row.name.clone();
        stored.unit_price = row.unit_price;
        stored.quantity = row.quantity;
        stored.options = row.options.clone();
        Ok(())
    }

    async fn delete_row(&self, cart_id: i64, row_id: &str) -> Result<(), DbError> {
        self.lock()?
            .rows
            .retain(|(id, r)| !(*id == cart_id && r.row_id == row_id));
        Ok(())
    }

    async fn count_rows(&self, cart_id: i64) -> Result<u64, DbError> {
        Ok(self
            .lock()?
            .rows
            .iter()
            .filter(|(id, _)| *id == cart_id)
            .count() as u64)
    }

    async fn touch(&self, cart_id: i64) -> Result<(), DbError> {
        let mut state = self.lock()?;
        if let Some(record) = state.carts.iter_mut().find(|c| c.id == cart_id) {
            record.updated_at = current_timestamp();
        }
        Ok(())
    }

    async fn delete_record(&self, cart_id: i64) -> Result<(), DbError> {
        let mut state = self.lock()?;
        state.rows.retain(|(id, _)| *id != cart_id);
        state.carts.retain(|c| c.id != cart_id);
        Ok(())
    }

    async fn find_by_owner(
        &self,
        owner_id: &str,
        cart_key: &str,
    ) -> Result<Option<StoredCart>, DbError> {
        let state = self.lock()?;
        let scope = CartScope::owner(owner_id, "").with_cart_key(cart_key);
        let Some(index) = state.find(&scope) else {
            return Ok(None);
        };
        let record = state.carts[index].clone();
        let rows = state
            .rows
            .iter()
            .filter(|(id, _)| *id == record.id)
            .map(|(_, row)| row.clone())
            .collect();
        Ok(Some(StoredCart { record, rows }))
    }
}
