//! Database connection and query execution.

use crate::{DbError, QueryResult, Row, Value};
use serde::de::DeserializeOwned;

/// SQLite database connection.
///
/// On `wasm32` this wraps Spin's SQLite connection; everywhere else it owns a
/// `rusqlite` connection (file-backed or in-memory).
pub struct Db {
    #[cfg(target_arch = "wasm32")]
    conn: spin_sdk::sqlite::Connection,
    #[cfg(not(target_arch = "wasm32"))]
    conn: std::sync::Mutex<rusqlite::Connection>,
}

#[cfg(target_arch = "wasm32")]
impl Db {
    /// Open the default SQLite database.
    pub fn open_default() -> Result<Self, DbError> {
        let conn = spin_sdk::sqlite::Connection::open_default()
            .map_err(|e| DbError::OpenError(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Open a named SQLite database.
    pub fn open(name: &str) -> Result<Self, DbError> {
        let conn = spin_sdk::sqlite::Connection::open(name)
            .map_err(|e| DbError::OpenError(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Execute a SQL statement that doesn't return rows.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<(), DbError> {
        let spin_params: Vec<spin_sdk::sqlite::Value> = params.iter().map(to_spin).collect();

        self.conn
            .execute(sql, spin_params.as_slice())
            .map_err(|e| DbError::QueryError(e.to_string()))?;

        Ok(())
    }

    /// Execute several `;`-separated statements without parameters.
    pub fn execute_batch(&self, sql: &str) -> Result<(), DbError> {
        for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            self.execute(statement, &[])?;
        }
        Ok(())
    }

    /// Execute a SQL query and return raw results.
    pub fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult, DbError> {
        let spin_params: Vec<spin_sdk::sqlite::Value> = params.iter().map(to_spin).collect();

        let result = self
            .conn
            .execute(sql, spin_params.as_slice())
            .map_err(|e| DbError::QueryError(e.to_string()))?;

        let columns: Vec<String> = result.columns.iter().map(|c| c.to_string()).collect();

        let rows: Vec<Row> = result
            .rows
            .iter()
            .map(|row| {
                let values: Vec<Value> = row
                    .values
                    .iter()
                    .map(|v| match v {
                        spin_sdk::sqlite::Value::Null => Value::Null,
                        spin_sdk::sqlite::Value::Integer(i) => Value::Integer(*i),
                        spin_sdk::sqlite::Value::Real(f) => Value::Real(*f),
                        spin_sdk::sqlite::Value::Text(s) => Value::Text(s.clone()),
                        spin_sdk::sqlite::Value::Blob(b) => Value::Blob(b.clone()),
                    })
                    .collect();
                Row::new(columns.clone(), values)
            })
            .collect();

        Ok(QueryResult::new(columns, rows))
    }
}

#[cfg(target_arch = "wasm32")]
fn to_spin(value: &Value) -> spin_sdk::sqlite::Value {
    match value {
        Value::Null => spin_sdk::sqlite::Value::Null,
        Value::Integer(i) => spin_sdk::sqlite::Value::Integer(*i),
        Value::Real(f) => spin_sdk::sqlite::Value::Real(*f),
        Value::Text(s) => spin_sdk::sqlite::Value::Text(s.clone()),
        Value::Blob(b) => spin_sdk::sqlite::Value::Blob(b.clone()),
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Db {
    /// Open (or create) a SQLite database file.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, DbError> {
        let conn = rusqlite::Connection::open(path.as_ref())
            .map_err(|e| DbError::OpenError(e.to_string()))?;
        Ok(Self {
            conn: std::sync::Mutex::new(conn),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| DbError::OpenError(e.to_string()))?;
        Ok(Self {
            conn: std::sync::Mutex::new(conn),
        })
    }

    /// Execute a SQL statement that doesn't return rows.
    ///
    /// Use this for INSERT, UPDATE, DELETE, CREATE TABLE, etc.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// db.execute(
    ///     "DELETE FROM cart_items WHERE cart_id = ? AND row_id = ?",
    ///     params![cart_id, row_id]
    /// )?;
    /// ```
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<(), DbError> {
        let conn = self.lock()?;
        conn.execute(sql, rusqlite::params_from_iter(params.iter().map(to_sql)))?;
        Ok(())
    }

    /// Execute several `;`-separated statements without parameters.
    pub fn execute_batch(&self, sql: &str) -> Result<(), DbError> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }

    /// Execute a SQL query and return raw results.
    pub fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult, DbError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = Vec::new();
        let mut cursor = stmt.query(rusqlite::params_from_iter(params.iter().map(to_sql)))?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                let value: rusqlite::types::Value = row.get(index)?;
                values.push(from_sql(value));
            }
            rows.push(Row::new(columns.clone(), values));
        }

        Ok(QueryResult::new(columns, rows))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, rusqlite::Connection>, DbError> {
        self.conn
            .lock()
            .map_err(|_| DbError::OpenError("connection lock poisoned".to_string()))
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn to_sql(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Integer(i) => rusqlite::types::Value::Integer(*i),
        Value::Real(f) => rusqlite::types::Value::Real(*f),
        Value::Text(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Blob(b) => rusqlite::types::Value::Blob(b.clone()),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn from_sql(value: rusqlite::types::Value) -> Value {
    match value {
        rusqlite::types::Value::Null => Value::Null,
        rusqlite::types::Value::Integer(i) => Value::Integer(i),
        rusqlite::types::Value::Real(f) => Value::Real(f),
        rusqlite::types::Value::Text(s) => Value::Text(s),
        rusqlite::types::Value::Blob(b) => Value::Blob(b),
    }
}

impl Db {
    /// Execute a SQL query and deserialize results into a vector.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let carts: Vec<CartRecord> = db.query_as(
    ///     "SELECT id, user_id, session_id FROM carts WHERE user_id = ?",
    ///     params![owner_id]
    /// )?;
    /// ```
    pub fn query_as<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<T>, DbError> {
        self.query(sql, params)?.deserialize_all()
    }

    /// Execute a SQL query and return a single row.
    ///
    /// Returns an error if no rows are returned.
    pub fn query_one<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<T, DbError> {
        let result = self.query(sql, params)?;
        result.first().ok_or(DbError::NotFound)?.deserialize()
    }

    /// Execute a SQL query and return an optional single row.
    ///
    /// Returns `None` if no rows are returned.
    pub fn query_optional<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<T>, DbError> {
        let result = self.query(sql, params)?;
        match result.first() {
            Some(row) => Ok(Some(row.deserialize()?)),
            None => Ok(None),
        }
    }
}
