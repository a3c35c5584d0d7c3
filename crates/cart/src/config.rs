//! Cart configuration.

use crate::error::ConfigError;
use crate::format::NumberFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Session key used when none is selected.
pub const DEFAULT_CART_KEY: &str = cart_db::DEFAULT_CART_KEY;

/// What happens to the durable record when its last row is removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyCartPolicy {
    /// Delete the record.
    #[default]
    Delete,
    /// Keep the record and refresh its timestamp.
    Keep,
}

/// Cart settings, loadable from TOML or JSON.
///
/// ```toml
/// tax = 21.0
/// database = true
/// default_key = "cart_items"
/// empty_cart = "keep"
/// sync_timeout_ms = 250
///
/// [format]
/// decimals = 2
/// decimal_point = ","
/// thousand_seperator = "."
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartConfig {
    /// Tax rate in percent applied to new line items.
    #[serde(default = "default_tax")]
    pub tax: f64,

    /// Mirror mutations to the durable store.
    #[serde(default)]
    pub database: bool,

    /// Rendering of formatted amounts.
    #[serde(default)]
    pub format: NumberFormat,

    /// Session key of the cart used until another is selected.
    #[serde(default = "default_key")]
    pub default_key: String,

    /// Handling of durable records that become empty.
    #[serde(default)]
    pub empty_cart: EmptyCartPolicy,

    /// Upper bound for each durable store call.
    #[serde(default = "default_sync_timeout_ms")]
    pub sync_timeout_ms: u64,
}

fn default_tax() -> f64 {
    21.0
}

fn default_key() -> String {
    DEFAULT_CART_KEY.to_string()
}

fn default_sync_timeout_ms() -> u64 {
    500
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            tax: default_tax(),
            database: false,
            format: NumberFormat::default(),
            default_key: default_key(),
            empty_cart: EmptyCartPolicy::default(),
            sync_timeout_ms: default_sync_timeout_ms(),
        }
    }
}

impl CartConfig {
    /// Load config from a file. `.json` files are parsed as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str::<Self>(content)?.validated()
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str::<Self>(content)?.validated()
    }

    /// Tax must be a percentage and the default key non-blank.
    fn validated(self) -> Result<Self, ConfigError> {
        if !(0.0..=100.0).contains(&self.tax) {
            return Err(ConfigError::Invalid(format!(
                "tax must be between 0 and 100, got {}",
                self.tax
            )));
        }
        if self.default_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "default_key must not be empty".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn with_tax(mut self, tax: f64) -> Self {
        self.tax = tax;
        self
    }

    pub fn with_database(mut self, enabled: bool) -> Self {
        self.database = enabled;
        self
    }

    pub fn with_format(mut self, format: NumberFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_default_key(mut self, key: impl Into<String>) -> Self {
        self.default_key = key.into();
        self
    }

    pub fn with_empty_cart(mut self, policy: EmptyCartPolicy) -> Self {
        self.empty_cart = policy;
        self
    }

    pub fn with_sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Bound for a single durable store call.
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CartConfig::default();
        assert_eq!(config.tax, 21.0);
        assert!(!config.database);
        assert_eq!(config.default_key, "cart_items");
        assert_eq!(config.empty_cart, EmptyCartPolicy::Delete);
        assert_eq!(config.sync_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        assert_eq!(CartConfig::from_toml_str("").unwrap(), CartConfig::default());
    }

    #[test]
    fn test_toml_overrides() {
        let config = CartConfig::from_toml_str(
            r#"
            tax = 10.0
            database = true
            empty_cart = "keep"
            sync_timeout_ms = 250

            [format]
            decimal_point = ","
            thousand_seperator = "."
            "#,
        )
        .unwrap();
        assert_eq!(config.tax, 10.0);
        assert!(config.database);
        assert_eq!(config.empty_cart, EmptyCartPolicy::Keep);
        assert_eq!(config.sync_timeout(), Duration::from_millis(250));
        assert_eq!(config.format.decimals, 2);
        assert_eq!(config.format.format(1234.5), "1.234,50");
    }

    #[test]
    fn test_json_config() {
        let config =
            CartConfig::from_json_str(r#"{"tax": 0, "default_key": "wishlist"}"#).unwrap();
        assert_eq!(config.tax, 0.0);
        assert_eq!(config.default_key, "wishlist");
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        for content in [r#"{"tax": 120}"#, r#"{"tax": -1}"#, r#"{"default_key": " "}"#] {
            let err = CartConfig::from_json_str(content).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{content}");
        }
        let err = CartConfig::from_toml_str(r#"default_key = """#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert_eq!(CartConfig::from_json_str(r#"{"tax": 100}"#).unwrap().tax, 100.0);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("cart-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"empty_cart": "keep"}"#).unwrap();
        let config = CartConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.empty_cart, EmptyCartPolicy::Keep);
    }

    #[test]
    fn test_load_missing_file() {
        let err = CartConfig::load("/nonexistent/cart.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
