//! Database value types and conversions.

use crate::DbError;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::de::DeserializeOwned;

/// A database value that can be used as a parameter or result.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value.
    Null,
    /// Integer value.
    Integer(i64),
    /// Real/float value.
    Real(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
}

impl Value {
    /// Try to get the value as an i64.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Real(f) => Some(*f as i64),
            _ => None,
        }
    }

    /// Try to get the value as an f64.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get the value as a string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Check if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// A row from a query result.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Create a new row from columns and values.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Get a value by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Get the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Try to deserialize the row into a type.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, DbError> {
        // Convert row to JSON value, then deserialize
        let map: serde_json::Map<String, serde_json::Value> = self
            .columns
            .iter()
            .zip(self.values.iter())
            .map(|(k, v)| (k.clone(), value_to_json(v)))
            .collect();

        let json = serde_json::Value::Object(map);
        serde_json::from_value(json).map_err(|e| DbError::DeserializeError(e.to_string()))
    }
}

/// Query result containing rows.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// The column names.
    pub columns: Vec<String>,
    /// The rows.
    pub rows: Vec<Row>,
}

impl QueryResult {
    /// Create a new query result.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Get the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get the first row.
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Iterate over the rows.
    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    /// Deserialize all rows into a vector of a type.
    pub fn deserialize_all<T: DeserializeOwned>(&self) -> Result<Vec<T>, DbError> {
        self.rows.iter().map(|row| row.deserialize()).collect()
    }
}

/// Convert a Value to a serde_json::Value.
fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => serde_json::Value::Number((*i).into()),
        Value::Real(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        // Non-UTF-8 blobs come back base64 encoded
        Value::Blob(b) => String::from_utf8(b.clone())
            .map(serde_json::Value::String)
            .unwrap_or_else(|_| serde_json::Value::String(STANDARD.encode(b))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Line {
        row_id: String,
        qty: f64,
        note: Option<String>,
    }

    fn row() -> Row {
        Row::new(
            vec!["row_id".into(), "qty".into(), "note".into()],
            vec![Value::from("abc"), Value::Real(2.0), Value::Null],
        )
    }

    #[test]
    fn test_row_get_by_column() {
        let row = row();
        assert_eq!(row.get("row_id").and_then(Value::as_text), Some("abc"));
        assert_eq!(row.get("qty").and_then(Value::as_real), Some(2.0));
        assert!(row.get("note").unwrap().is_null());
        assert!(row.get("missing").is_none());
    }

    #[test]
    fn test_row_deserialize() {
        let line: Line = row().deserialize().unwrap();
        assert_eq!(
            line,
            Line {
                row_id: "abc".into(),
                qty: 2.0,
                note: None
            }
        );
    }

    #[test]
    fn test_value_option_conversion() {
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some(3_i64)), Value::Integer(3));
    }

    #[test]
    fn test_binary_blob_is_base64() {
        let json = value_to_json(&Value::Blob(vec![0xff, 0xfe]));
        assert_eq!(json, serde_json::Value::String("//4=".into()));
    }
}
