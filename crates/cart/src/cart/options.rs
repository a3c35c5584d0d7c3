//! Line item options.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Option key holding a flat discount for the whole line.
pub const DISCOUNT_KEY: &str = "discount";

/// Option key holding the stock ceiling for a merged row.
pub const TOTAL_STOCK_KEY: &str = "totalStock";

/// A scalar option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl OptionValue {
    /// Numeric reading of the value.
    ///
    /// Text counts when it parses as a finite number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OptionValue::Number(n) => Some(*n),
            OptionValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            OptionValue::Bool(_) => None,
        }
    }

    /// Get the text, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(OptionValue::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(OptionValue::Number),
            serde_json::Value::String(s) => Some(OptionValue::Text(s.clone())),
            other => Some(OptionValue::Text(other.to_string())),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            OptionValue::Bool(b) => serde_json::Value::Bool(*b),
            OptionValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            OptionValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::Number(n) => write!(f, "{n}"),
            OptionValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Text(s.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        OptionValue::Text(s)
    }
}

impl From<f64> for OptionValue {
    fn from(n: f64) -> Self {
        OptionValue::Number(n)
    }
}

impl From<i32> for OptionValue {
    fn from(n: i32) -> Self {
        OptionValue::Number(f64::from(n))
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Bool(b)
    }
}

/// Named options attached to a line item, e.g. size or color.
///
/// Keeps insertion order for display. Equality and row identity ignore order.
#[derive(Debug, Clone, Default)]
pub struct OptionSet {
    entries: Vec<(String, OptionValue)>,
}

impl OptionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a value. A replaced key keeps its position.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<OptionValue>,
    ) -> Option<OptionValue> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entries sorted by key.
    pub fn canonicalize(&self) -> Vec<(&str, &OptionValue)> {
        let mut sorted: Vec<_> = self.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        sorted
    }

    /// Stable byte encoding of the sorted entries, used for row identity.
    pub(crate) fn canonical_bytes(&self) -> Vec<u8> {
        // Serializing strs, bools and f64s into a Vec cannot fail.
        serde_json::to_vec(&self.canonicalize()).unwrap_or_default()
    }

    /// Line discount, zero when absent or not numeric.
    pub fn discount(&self) -> f64 {
        self.get(DISCOUNT_KEY)
            .and_then(OptionValue::as_f64)
            .unwrap_or(0.0)
    }

    /// Stock ceiling, when present and numeric.
    pub fn total_stock(&self) -> Option<f64> {
        self.get(TOTAL_STOCK_KEY).and_then(OptionValue::as_f64)
    }

    /// Copy of the set without the stock ceiling.
    pub fn without_stock(&self) -> Self {
        let mut copy = self.clone();
        copy.remove(TOTAL_STOCK_KEY);
        copy
    }

    /// Convert to a JSON object for durable storage.
    pub fn to_json_map(&self) -> serde_json::Map<String, serde_json::Value> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.to_json()))
            .collect()
    }

    /// Build from a stored JSON object. Null values are dropped.
    pub fn from_json_map(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        map.iter()
            .filter_map(|(k, v)| OptionValue::from_json(v).map(|v| (k.clone(), v)))
            .collect()
    }
}

impl PartialEq for OptionSet {
    fn eq(&self, other: &Self) -> bool {
        self.canonicalize() == other.canonicalize()
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for OptionSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = OptionSet::new();
        for (key, value) in iter {
            set.insert(key, value);
        }
        set
    }
}

impl Serialize for OptionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OptionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OptionSetVisitor;

        impl<'de> Visitor<'de> for OptionSetVisitor {
            type Value = OptionSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of option names to strings, numbers or booleans")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<OptionSet, A::Error> {
                let mut set = OptionSet::new();
                while let Some((key, value)) = access.next_entry::<String, OptionValue>()? {
                    set.insert(key, value);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(OptionSetVisitor)
    }
}
