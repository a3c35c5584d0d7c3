//! The cart aggregate.

use crate::cart::{
    item_record, Amount, CartContent, CartPricing, CartStore, ItemFields, ItemPatch, LineItem,
    OptionSet,
};
use crate::config::CartConfig;
use crate::error::CartError;
use crate::format::NumberFormat;
use crate::ids::{ProductId, RowId};
use crate::shopper::IdentityProvider;
use crate::sync::DurableSync;
use crate::validation::{FieldValidator, RuleSet, RuleValidator};
use cart_cache::{KvSlot, Session};
use cart_db::{CartRepository, CartRow};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Session marker set once a cart key has been restored from the durable store.
const HYDRATED_FLAG: &str = "hydrated";

/// Outcome of importing stored rows.
#[derive(Debug, Default)]
struct Import {
    imported: usize,
    /// Stored ids that no longer match the item they hold.
    stale: Vec<String>,
    /// Items whose stored row must be rewritten.
    rekeyed: Vec<LineItem>,
}

/// A shopping cart held in the session.
///
/// The session copy is authoritative. When a [`DurableSync`] is attached,
/// each successful mutation is mirrored to the durable store on a
/// best-effort basis.
///
/// # Example
///
/// ```rust,ignore
/// let session = Session::new(SessionId::generate(), MemorySlot::new());
/// let mut cart = Cart::new(session, CartConfig::default());
///
/// let row_id = cart.add("sku-1", "T-Shirt", 19.99, 2, OptionSet::new().with("size", "L")).await?;
/// cart.update(row_id.as_str(), 3).await?;
/// println!("{}", cart.total()?);
/// ```
pub struct Cart<S> {
    store: CartStore<S>,
    config: CartConfig,
    validator: Box<dyn FieldValidator>,
    sync: Option<DurableSync>,
}

impl<S: KvSlot> Cart<S> {
    /// Create a session-only cart using the configured default key.
    pub fn new(session: Session<S>, config: CartConfig) -> Self {
        Self {
            store: CartStore::new(session, config.default_key.clone()),
            config,
            validator: Box::new(RuleValidator),
            sync: None,
        }
    }

    /// Create a cart and, when `database` is enabled, attach durable sync
    /// for `identity`.
    pub async fn connect(
        session: Session<S>,
        config: CartConfig,
        identity: &dyn IdentityProvider,
        repo: Arc<dyn CartRepository>,
    ) -> Self {
        let mut cart = Self::new(session, config);
        if cart.config.database {
            let sync = DurableSync::attach(repo, identity, &cart.config).await;
            cart.sync = Some(sync);
        }
        cart
    }

    pub fn with_validator(mut self, validator: impl FieldValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn with_durable_sync(mut self, sync: DurableSync) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Switch to another cart in the same session. Durable sync follows
    /// to that cart's own record.
    pub fn select(&mut self, key: &str) -> Result<&mut Self, CartError> {
        if key.trim().is_empty() {
            return Err(CartError::InvalidItem("Session key is required.".to_string()));
        }
        self.store.set_key(key);
        if let Some(sync) = self.sync.as_mut() {
            sync.select(key);
        }
        Ok(self)
    }

    /// Key of the active cart.
    pub fn key(&self) -> &str {
        self.store.key()
    }

    pub fn config(&self) -> &CartConfig {
        &self.config
    }

    pub fn durable_sync(&self) -> Option<&DurableSync> {
        self.sync.as_ref()
    }

    /// Add a product, merging with an identical row.
    ///
    /// Price and quantity may be numbers or numeric text. When the row
    /// already exists the quantities are summed, capped by a `totalStock`
    /// option if one is given.
    pub async fn add(
        &mut self,
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        unit_price: impl Into<Amount>,
        quantity: impl Into<Amount>,
        options: OptionSet,
    ) -> Result<RowId, CartError> {
        let stock = options.total_stock();
        let mut candidate = self.build_item(
            product_id.into(),
            name.into(),
            unit_price.into(),
            quantity.into(),
            options,
        )?;

        let mut content = self.store.load()?;
        if let Some(existing) = content.get(candidate.row_id().as_str()) {
            let mut merged = existing.quantity + candidate.quantity;
            if let Some(stock) = stock {
                merged = merged.min(stock);
            }
            candidate.quantity = merged;
        }
        content.put(candidate.clone());
        self.store.save(&content)?;
        debug!(row_id = %candidate.row_id(), quantity = candidate.quantity, "added cart item");

        if let Some(sync) = self.sync.as_mut() {
            sync.mirror_add(&candidate).await;
        }
        Ok(candidate.row_id().clone())
    }

    /// Change an existing row. The row id never changes, even when the
    /// product or options do.
    pub async fn update(
        &mut self,
        row_id: impl AsRef<str>,
        patch: impl Into<ItemPatch>,
    ) -> Result<LineItem, CartError> {
        let row_id = row_id.as_ref();
        let fields = match patch.into() {
            ItemPatch::Quantity(quantity) => {
                if quantity == 0.0 || !quantity.is_finite() {
                    return Err(CartError::InvalidItem(
                        "Please supply a valid quantity.".to_string(),
                    ));
                }
                ItemFields::new().quantity(quantity)
            }
            ItemPatch::Fields(fields) => {
                if fields.is_empty() {
                    return Err(CartError::InvalidItem(
                        "Please supply a valid quantity.".to_string(),
                    ));
                }
                fields
            }
        };
        let record = fields.record();
        self.validator
            .validate(&record, &RuleSet::line_item().restricted_to(&record))
            .map_err(CartError::InvalidItem)?;

        let mut content = self.store.load()?;
        let item = content
            .get_mut(row_id)
            .ok_or_else(|| CartError::not_found(row_id))?;
        item.apply(fields);
        let updated = item.clone();
        self.store.save(&content)?;
        debug!(row_id, quantity = updated.quantity, "updated cart item");

        if let Some(sync) = self.sync.as_mut() {
            sync.mirror_update(&updated).await;
        }
        Ok(updated)
    }

    /// Remove a row.
    pub async fn remove(&mut self, row_id: impl AsRef<str>) -> Result<(), CartError> {
        let row_id = row_id.as_ref();
        let mut content = self.store.load()?;
        content
            .pull(row_id)
            .ok_or_else(|| CartError::not_found(row_id))?;
        self.store.save(&content)?;
        debug!(row_id, "removed cart item");

        if let Some(sync) = self.sync.as_mut() {
            sync.mirror_remove(row_id).await;
        }
        Ok(())
    }

    /// Empty the active cart.
    pub async fn destroy(&mut self) -> Result<(), CartError> {
        self.store.clear()?;
        debug!(key = self.store.key(), "destroyed cart");

        if let Some(sync) = self.sync.as_mut() {
            sync.mirror_destroy().await;
        }
        Ok(())
    }

    pub fn has(&self, row_id: impl AsRef<str>) -> Result<bool, CartError> {
        Ok(self.store.load()?.has(row_id.as_ref()))
    }

    pub fn get(&self, row_id: impl AsRef<str>) -> Result<LineItem, CartError> {
        let row_id = row_id.as_ref();
        self.store
            .load()?
            .pull(row_id)
            .ok_or_else(|| CartError::not_found(row_id))
    }

    /// All rows in insertion order.
    pub fn content(&self) -> Result<Vec<LineItem>, CartError> {
        Ok(self.store.load()?.into_vec())
    }

    /// Total quantity across rows.
    pub fn count(&self) -> Result<f64, CartError> {
        Ok(self.store.load()?.quantity())
    }

    /// Rows matching `predicate`.
    pub fn search<F>(&self, predicate: F) -> Result<Vec<LineItem>, CartError>
    where
        F: Fn(&LineItem) -> bool,
    {
        Ok(self
            .store
            .load()?
            .into_vec()
            .into_iter()
            .filter(|item| predicate(item))
            .collect())
    }

    /// Unrounded totals.
    pub fn pricing(&self) -> Result<CartPricing, CartError> {
        let content = self.store.load()?;
        Ok(CartPricing::from_items(content.iter()))
    }

    pub fn subtotal(&self) -> Result<String, CartError> {
        self.subtotal_with(&self.config.format)
    }

    pub fn subtotal_with(&self, format: &NumberFormat) -> Result<String, CartError> {
        Ok(format.format(self.pricing()?.subtotal))
    }

    pub fn tax(&self) -> Result<String, CartError> {
        self.tax_with(&self.config.format)
    }

    pub fn tax_with(&self, format: &NumberFormat) -> Result<String, CartError> {
        Ok(format.format(self.pricing()?.tax))
    }

    pub fn discount(&self) -> Result<String, CartError> {
        self.discount_with(&self.config.format)
    }

    pub fn discount_with(&self, format: &NumberFormat) -> Result<String, CartError> {
        Ok(format.format(self.pricing()?.discount))
    }

    pub fn total(&self) -> Result<String, CartError> {
        self.total_with(&self.config.format)
    }

    pub fn total_with(&self, format: &NumberFormat) -> Result<String, CartError> {
        Ok(format.format(self.pricing()?.total))
    }

    /// Restore the owner's stored cart for the active key into an empty
    /// session cart.
    ///
    /// Runs at most once per cart key and session, and only for an
    /// authenticated owner. Rows are not written back, except those stored
    /// under an outdated id or merged with another row, which are re-keyed.
    /// Returns the number of rows imported.
    pub async fn hydrate(&mut self) -> Result<usize, CartError> {
        let Some(sync) = self.sync.as_ref() else {
            return Ok(0);
        };
        if sync.scope().owner_id.is_none() {
            return Ok(0);
        }
        if !self.store.load()?.is_empty() || self.store.flag(HYDRATED_FLAG)? {
            return Ok(0);
        }
        self.store.set_flag(HYDRATED_FLAG)?;

        let rows = match sync.owner_rows().await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "failed to read durable cart for hydration");
                return Ok(0);
            }
        };
        if rows.is_empty() {
            return Ok(0);
        }

        let import = self.import_rows(&rows)?;
        info!(
            imported = import.imported,
            rekeyed = import.rekeyed.len(),
            key = self.store.key(),
            "restored cart from durable store"
        );
        if !import.rekeyed.is_empty() {
            if let Some(sync) = self.sync.as_mut() {
                sync.mirror_rekey(&import.stale, &import.rekeyed).await;
            }
        }
        Ok(import.imported)
    }

    /// Add stored rows to the session cart without mirroring them back.
    ///
    /// Rows that fail validation are skipped.
    pub fn load_from_records(&mut self, rows: &[CartRow]) -> Result<usize, CartError> {
        Ok(self.import_rows(rows)?.imported)
    }

    fn import_rows(&mut self, rows: &[CartRow]) -> Result<Import, CartError> {
        let mut content = self.store.load()?;
        let mut import = Import::default();
        // Resulting row ids, flagged when their stored row must be rewritten.
        let mut touched: Vec<(RowId, bool)> = Vec::new();
        for row in rows {
            let item = match self.build_item(
                ProductId::new(row.product_id.as_str()),
                row.name.clone(),
                Amount::Number(row.unit_price),
                Amount::Number(row.quantity),
                OptionSet::from_json_map(&row.options),
            ) {
                Ok(item) => item,
                Err(e) => {
                    warn!(row_id = %row.row_id, error = %e, "skipping invalid stored cart row");
                    continue;
                }
            };
            let row_id = item.row_id().clone();
            let outdated = row.row_id != row_id.as_str();
            if outdated && !import.stale.contains(&row.row_id) {
                import.stale.push(row.row_id.clone());
            }
            match touched.iter_mut().find(|(id, _)| *id == row_id) {
                Some((_, rewrite)) => *rewrite = true,
                None => touched.push((row_id, outdated)),
            }
            merge_into(&mut content, item);
            import.imported += 1;
        }
        self.store.save(&content)?;

        import.rekeyed = touched
            .into_iter()
            .filter(|(id, rewrite)| *rewrite || import.stale.iter().any(|s| s == id.as_str()))
            .filter_map(|(id, _)| content.get(id.as_str()).cloned())
            .collect();
        Ok(import)
    }

    fn build_item(
        &self,
        product_id: ProductId,
        name: String,
        unit_price: Amount,
        quantity: Amount,
        options: OptionSet,
    ) -> Result<LineItem, CartError> {
        let record = item_record(&product_id, &name, &unit_price, &quantity);
        self.validator
            .validate(&record, &RuleSet::line_item())
            .map_err(CartError::InvalidItem)?;

        let (Some(unit_price), Some(quantity)) = (unit_price.normalize(), quantity.normalize())
        else {
            return Err(CartError::InvalidItem(
                "Please supply a valid price and quantity.".to_string(),
            ));
        };
        Ok(LineItem::new(
            product_id,
            name,
            unit_price,
            quantity,
            options,
            self.config.tax,
        ))
    }
}

fn merge_into(content: &mut CartContent, mut item: LineItem) {
    if let Some(existing) = content.get(item.row_id().as_str()) {
        item.quantity += existing.quantity;
    }
    content.put(item);
}
