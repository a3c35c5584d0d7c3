//! Shopping cart module.
//!
//! Contains the cart aggregate, line items, options, pricing, and the
//! session-backed store.

mod cart;
mod item;
mod options;
mod pricing;
mod store;

pub use cart::Cart;
pub(crate) use item::item_record;
pub use item::{Amount, FormattedLineItem, ItemFields, ItemPatch, LineItem};
pub use options::{OptionSet, OptionValue, DISCOUNT_KEY, TOTAL_STOCK_KEY};
pub use pricing::{CartPricing, FormattedPricing, LineItemPricing};
pub use store::{CartContent, CartStore};
