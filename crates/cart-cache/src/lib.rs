//! Session-scoped transient storage for shopping carts.
//!
//! A [`KvSlot`] is the raw byte-level Key-Value contract; [`Cache`] adds JSON
//! serialization on top of it and [`Session`] namespaces every key by
//! session ID. [`MemorySlot`] is the in-process implementation; on `wasm32`
//! targets `SpinSlot` uses Spin's Key-Value Store.
//!
//! # Example
//!
//! ```rust,ignore
//! use cart_cache::{MemorySlot, Session, SessionId};
//!
//! let session = Session::new(SessionId::generate(), MemorySlot::new());
//! session.put("cart_items", &items)?;
//! let items: Option<Vec<LineItem>> = session.get("cart_items")?;
//! ```

mod error;
mod kv;
mod session;

pub use error::CacheError;
#[cfg(target_arch = "wasm32")]
pub use kv::SpinSlot;
pub use kv::{Cache, KvSlot, MemorySlot};
pub use session::{Session, SessionId};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Cache, CacheError, KvSlot, MemorySlot, Session, SessionId};
}
