//! Session-backed cart content.

use crate::cart::LineItem;
use cart_cache::{cache_key, CacheError, KvSlot, Session};
use serde::{Deserialize, Serialize};

/// Line items of one cart, in insertion order, unique by row id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartContent {
    items: Vec<LineItem>,
}

impl CartContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, row_id: &str) -> bool {
        self.get(row_id).is_some()
    }

    pub fn get(&self, row_id: &str) -> Option<&LineItem> {
        self.items.iter().find(|i| i.row_id().as_str() == row_id)
    }

    pub fn get_mut(&mut self, row_id: &str) -> Option<&mut LineItem> {
        self.items.iter_mut().find(|i| i.row_id().as_str() == row_id)
    }

    /// Insert, or replace the item with the same row id in place.
    pub fn put(&mut self, item: LineItem) {
        match self.get_mut(item.row_id().as_str()) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    /// Remove and return an item.
    pub fn pull(&mut self, row_id: &str) -> Option<LineItem> {
        let index = self
            .items
            .iter()
            .position(|i| i.row_id().as_str() == row_id)?;
        Some(self.items.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineItem> {
        self.items.iter()
    }

    /// Number of distinct rows.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities.
    pub fn quantity(&self) -> f64 {
        // `sum` over no floats is -0.0.
        self.items.iter().fold(0.0, |total, i| total + i.quantity)
    }

    pub fn into_vec(self) -> Vec<LineItem> {
        self.items
    }
}

/// Reads and writes cart content under a key of the session.
///
/// Different keys hold independent carts in the same session.
pub struct CartStore<S> {
    session: Session<S>,
    key: String,
}

impl<S: KvSlot> CartStore<S> {
    pub fn new(session: Session<S>, key: impl Into<String>) -> Self {
        Self {
            session,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = key.into();
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    /// Current content; empty if nothing was stored yet.
    pub fn load(&self) -> Result<CartContent, CacheError> {
        Ok(self.session.get(&self.key)?.unwrap_or_default())
    }

    pub fn save(&self, content: &CartContent) -> Result<(), CacheError> {
        self.session.put(&self.key, content)
    }

    pub fn clear(&self) -> Result<(), CacheError> {
        self.session.forget(&self.key)
    }

    /// Whether a per-key marker is set in the session.
    pub fn flag(&self, name: &str) -> Result<bool, CacheError> {
        self.session.has(&self.flag_key(name))
    }

    pub fn set_flag(&self, name: &str) -> Result<(), CacheError> {
        self.session.put(&self.flag_key(name), &true)
    }

    fn flag_key(&self, name: &str) -> String {
        cache_key!("flag", name, self.key)
    }
}
