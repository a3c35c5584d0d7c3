//! Cart error types.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by cart operations.
#[derive(Error, Debug)]
pub enum CartError {
    /// Input failed validation; nothing was changed.
    #[error("Invalid item: {0}")]
    InvalidItem(String),

    /// The referenced row is not in the cart.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// The session store could not be read or written.
    #[error("Cart storage error: {0}")]
    Storage(#[from] cart_cache::CacheError),
}

impl CartError {
    pub(crate) fn not_found(row_id: &str) -> Self {
        CartError::ItemNotFound(format!("The cart does not contain rowId {row_id}."))
    }
}

/// Failure of a durable store call.
///
/// Never returned from cart operations; the cart logs it and carries on.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The call did not finish within the configured bound.
    #[error("Durable store call timed out after {0:?}")]
    Timeout(Duration),

    /// The repository reported an error.
    #[error("Durable store error: {0}")]
    Db(#[from] cart_db::DbError),
}

/// Errors loading a [`CartConfig`](crate::CartConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// TOML syntax or shape error.
    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON syntax or shape error.
    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// A value parsed but is out of range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}
