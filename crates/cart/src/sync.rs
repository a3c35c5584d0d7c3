//! Best-effort mirroring of cart mutations to a durable store.
//!
//! Every repository call is bounded by the configured timeout. Failures are
//! logged and swallowed so the session cart stays authoritative.

use crate::cart::LineItem;
use crate::config::{CartConfig, EmptyCartPolicy};
use crate::error::SyncError;
use crate::shopper::IdentityProvider;
use cart_db::{CartRecord, CartRepository, CartRow, CartScope, DbError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Link between a session cart and its durable record.
pub struct DurableSync {
    repo: Arc<dyn CartRepository>,
    scope: CartScope,
    record: Option<CartRecord>,
    timeout: Duration,
    empty_cart: EmptyCartPolicy,
}

impl DurableSync {
    /// Build without touching the store.
    pub fn new(repo: Arc<dyn CartRepository>, scope: CartScope, config: &CartConfig) -> Self {
        Self {
            repo,
            scope,
            record: None,
            timeout: config.sync_timeout(),
            empty_cart: config.empty_cart,
        }
    }

    /// Build for the current identity and resolve its record for the
    /// configured default cart key.
    ///
    /// An unreachable store leaves the record unresolved; it is retried on
    /// the next mutation.
    pub async fn attach(
        repo: Arc<dyn CartRepository>,
        identity: &dyn IdentityProvider,
        config: &CartConfig,
    ) -> Self {
        let scope = identity
            .cart_scope()
            .with_cart_key(config.default_key.clone());
        let mut sync = Self::new(repo, scope, config);
        if let Err(e) = sync.ensure_record().await {
            warn!(error = %e, "failed to resolve durable cart record");
        }
        sync
    }

    pub fn scope(&self) -> &CartScope {
        &self.scope
    }

    /// Record resolved so far, if any.
    pub fn record(&self) -> Option<&CartRecord> {
        self.record.as_ref()
    }

    /// Follow the cart to another key. The new record is resolved on the
    /// next durable call.
    pub fn select(&mut self, cart_key: &str) {
        if self.scope.cart_key != cart_key {
            self.scope.cart_key = cart_key.to_string();
            self.record = None;
        }
    }

    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, DbError>>,
    ) -> Result<T, SyncError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(SyncError::Timeout(self.timeout)),
        }
    }

    async fn ensure_record(&mut self) -> Result<i64, SyncError> {
        if let Some(record) = &self.record {
            return Ok(record.id);
        }
        let record = self.call(self.repo.find_or_create(&self.scope)).await?;
        let id = record.id;
        debug!(cart_id = id, "resolved durable cart record");
        self.record = Some(record);
        Ok(id)
    }

    /// Insert or replace the row for `item`.
    #[tracing::instrument(skip_all, fields(row_id = %item.row_id()))]
    pub async fn mirror_add(&mut self, item: &LineItem) {
        let row = item.to_row();
        let result = async {
            let cart_id = self.ensure_record().await?;
            self.call(self.repo.upsert_row(cart_id, &row)).await
        }
        .await;
        if let Err(e) = result {
            warn!(error = %e, "failed to mirror added cart item");
        }
    }

    /// Rewrite the stored row for `item` in place.
    #[tracing::instrument(skip_all, fields(row_id = %item.row_id()))]
    pub async fn mirror_update(&mut self, item: &LineItem) {
        let row = item.to_row();
        let result = async {
            let cart_id = self.ensure_record().await?;
            self.call(self.repo.update_row(cart_id, &row)).await
        }
        .await;
        if let Err(e) = result {
            warn!(error = %e, "failed to mirror updated cart item");
        }
    }

    /// Delete a row, then apply the empty-cart policy.
    #[tracing::instrument(skip(self))]
    pub async fn mirror_remove(&mut self, row_id: &str) {
        if let Err(e) = self.try_remove(row_id).await {
            warn!(error = %e, "failed to mirror removed cart item");
        }
    }

    async fn try_remove(&mut self, row_id: &str) -> Result<(), SyncError> {
        let cart_id = self.ensure_record().await?;
        self.call(self.repo.delete_row(cart_id, row_id)).await?;

        let remaining = self.call(self.repo.count_rows(cart_id)).await?;
        if remaining == 0 && self.empty_cart == EmptyCartPolicy::Delete {
            self.call(self.repo.delete_record(cart_id)).await?;
            self.record = None;
            info!(cart_id, "deleted empty durable cart");
        } else {
            self.call(self.repo.touch(cart_id)).await?;
        }
        Ok(())
    }

    /// Replace rows stored under outdated ids with `items`.
    ///
    /// Stale ids are deleted before the items are written, so an id that is
    /// both stale and current ends up holding the current item.
    #[tracing::instrument(skip_all, fields(stale = stale.len(), items = items.len()))]
    pub async fn mirror_rekey(&mut self, stale: &[String], items: &[LineItem]) {
        let result = async {
            let cart_id = self.ensure_record().await?;
            for row_id in stale {
                self.call(self.repo.delete_row(cart_id, row_id)).await?;
            }
            for item in items {
                self.call(self.repo.upsert_row(cart_id, &item.to_row())).await?;
            }
            Ok::<_, SyncError>(())
        }
        .await;
        if let Err(e) = result {
            warn!(error = %e, "failed to re-key stored cart rows");
        }
    }

    /// Delete the durable record and its rows.
    #[tracing::instrument(skip(self))]
    pub async fn mirror_destroy(&mut self) {
        let result = async {
            let cart_id = self.ensure_record().await?;
            self.call(self.repo.delete_record(cart_id)).await?;
            self.record = None;
            Ok::<_, SyncError>(cart_id)
        }
        .await;
        match result {
            Ok(cart_id) => info!(cart_id, "deleted durable cart"),
            Err(e) => warn!(error = %e, "failed to mirror cart destroy"),
        }
    }

    /// Stored rows of the authenticated owner for the current cart key;
    /// empty for guests.
    pub async fn owner_rows(&self) -> Result<Vec<CartRow>, SyncError> {
        let Some(owner_id) = self.scope.owner_id.as_deref() else {
            return Ok(Vec::new());
        };
        let stored = self
            .call(self.repo.find_by_owner(owner_id, &self.scope.cart_key))
            .await?;
        Ok(stored.map(|s| s.rows).unwrap_or_default())
    }
}
