//! Durable cart records on SQLite.
//!
//! [`Db`] is a small typed layer over SQLite (Spin's connection on `wasm32`,
//! `rusqlite` elsewhere). [`CartRepository`] is the durable-store contract the
//! cart synchronizes against, with [`SqliteCartRepository`] and
//! [`MemoryCartRepository`] as implementations.
//!
//! # Example
//!
//! ```rust,ignore
//! use cart_db::{CartRepository, CartScope, Db, SqliteCartRepository, DEFAULT_CART_KEY};
//!
//! let repo = SqliteCartRepository::new(Db::open("carts.db")?);
//! repo.migrate()?;
//!
//! let record = repo.find_or_create(&CartScope::owner("user-42", "sess_abc")).await?;
//! if let Some(stored) = repo.find_by_owner("user-42", DEFAULT_CART_KEY).await? {
//!     println!("{} rows", stored.rows.len());
//! }
//! ```

mod db;
mod error;
mod memory;
mod repository;
mod sqlite;
mod types;

pub use db::Db;
pub use error::DbError;
pub use memory::MemoryCartRepository;
pub use repository::{
    CartRecord, CartRepository, CartRow, CartScope, StoredCart, DEFAULT_CART_KEY,
};
pub use sqlite::{SqliteCartRepository, SCHEMA};
pub use types::{QueryResult, Row, Value};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        params, CartRecord, CartRepository, CartRow, CartScope, Db, DbError, StoredCart, Value,
    };
}

/// Create a parameter list for SQL queries.
///
/// # Example
///
/// ```rust,ignore
/// use cart_db::params;
///
/// let params = params!["value1", 42_i64, 3.14];
/// ```
#[macro_export]
macro_rules! params {
    () => {
        &[]
    };
    ($($param:expr),+ $(,)?) => {
        &[$($crate::Value::from($param)),+]
    };
}
