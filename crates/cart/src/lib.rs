//! Session shopping cart with optional durable sync.
//!
//! - **Cart**: add, update, remove and price line items held in the session
//! - **Identity**: row ids derived from product and options
//! - **Sync**: best-effort mirroring to a [`CartRepository`](cart_db::CartRepository),
//!   plus restoring an owner's cart on login
//!
//! # Example
//!
//! ```rust,ignore
//! use cart::prelude::*;
//! use cart_cache::{MemorySlot, Session, SessionId};
//! use cart_db::MemoryCartRepository;
//! use std::sync::Arc;
//!
//! let shopper = Shopper::authenticated("user-42", SessionId::generate());
//! let session = Session::new(shopper.session_id().clone(), MemorySlot::new());
//! let config = CartConfig::load("cart.toml")?;
//!
//! let mut cart = Cart::connect(session, config, &shopper, Arc::new(MemoryCartRepository::new())).await;
//! cart.hydrate().await?;
//!
//! let row_id = cart.add("sku-1", "Rust Programming Book", "49.99", 1, OptionSet::new()).await?;
//! cart.update(&row_id, 2).await?;
//! println!("Total: {}", cart.total()?);
//! ```

pub mod cart;
pub mod config;
pub mod error;
pub mod format;
pub mod ids;
pub mod shopper;
pub mod sync;
pub mod validation;

pub use cart::{
    Amount, Cart, CartPricing, ItemFields, ItemPatch, LineItem, OptionSet, OptionValue,
};
pub use config::{CartConfig, EmptyCartPolicy, DEFAULT_CART_KEY};
pub use error::{CartError, ConfigError, SyncError};
pub use format::NumberFormat;
pub use ids::{ProductId, RowId};
pub use shopper::{IdentityProvider, Shopper};
pub use sync::DurableSync;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::cart::{
        Amount, Cart, CartContent, CartPricing, FormattedLineItem, FormattedPricing, ItemFields,
        ItemPatch, LineItem, LineItemPricing, OptionSet, OptionValue, DISCOUNT_KEY,
        TOTAL_STOCK_KEY,
    };
    pub use crate::config::{CartConfig, EmptyCartPolicy};
    pub use crate::error::{CartError, ConfigError, SyncError};
    pub use crate::format::NumberFormat;
    pub use crate::ids::{ProductId, RowId};
    pub use crate::shopper::{IdentityProvider, Shopper};
    pub use crate::sync::DurableSync;
    pub use crate::validation::{FieldValidator, Rule, RuleSet, RuleValidator};
}
