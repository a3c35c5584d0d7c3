//! SQLite-backed cart repository.

use crate::repository::current_timestamp;
use crate::{params, CartRecord, CartRepository, CartRow, CartScope, Db, DbError, StoredCart};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Tables used by [`SqliteCartRepository`].
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS carts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT,
    session_id TEXT NOT NULL,
    cart_key TEXT NOT NULL DEFAULT 'cart_items',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS carts_user_id ON carts (user_id, cart_key);
CREATE INDEX IF NOT EXISTS carts_session_id ON carts (session_id, cart_key);
CREATE TABLE IF NOT EXISTS cart_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    cart_id INTEGER NOT NULL,
    row_id TEXT NOT NULL,
    product_id TEXT NOT NULL,
    title TEXT NOT NULL,
    price REAL NOT NULL,
    qty REAL NOT NULL,
    options TEXT NOT NULL DEFAULT '{}',
    UNIQUE (cart_id, row_id, product_id)
);
";

const RECORD_COLUMNS: &str = "id, user_id, session_id, cart_key, created_at, updated_at";

/// Row shape of `cart_items`.
#[derive(Deserialize)]
struct ItemRecord {
    row_id: String,
    product_id: String,
    title: String,
    price: f64,
    qty: f64,
    options: String,
}

impl TryFrom<ItemRecord> for CartRow {
    type Error = DbError;

    fn try_from(record: ItemRecord) -> Result<Self, Self::Error> {
        let options = match serde_json::from_str(&record.options)? {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                return Err(DbError::TypeError(format!(
                    "options for row {} is not an object: {other}",
                    record.row_id
                )))
            }
        };
        Ok(CartRow {
            row_id: record.row_id,
            product_id: record.product_id,
            name: record.title,
            unit_price: record.price,
            quantity: record.qty,
            options,
        })
    }
}

#[derive(Deserialize)]
struct Count {
    n: i64,
}

/// Cart repository over a [`Db`] connection.
///
/// On native targets each call runs on tokio's blocking pool, so a caller's
/// timeout is honored even while SQLite waits on a lock.
///
/// # Example
///
/// ```rust,ignore
/// let repo = SqliteCartRepository::new(Db::open("carts.db")?);
/// repo.migrate()?;
/// let record = repo.find_or_create(&CartScope::anonymous("sess_abc")).await?;
/// ```
pub struct SqliteCartRepository {
    db: Arc<Db>,
}

impl SqliteCartRepository {
    /// Wrap an open connection.
    pub fn new(db: Db) -> Self {
        Self { db: Arc::new(db) }
    }

    /// Create the tables if they do not exist yet.
    pub fn migrate(&self) -> Result<(), DbError> {
        self.db.execute_batch(SCHEMA)?;
        debug!("cart schema ready");
        Ok(())
    }

    /// Borrow the connection.
    pub fn db(&self) -> &Db {
        &self.db
    }

    #[cfg(not(target_arch = "wasm32"))]
    async fn run<T, F>(&self, work: F) -> Result<T, DbError>
    where
        T: Send + 'static,
        F: FnOnce(&Db) -> Result<T, DbError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || work(&db))
            .await
            .map_err(|e| DbError::QueryError(format!("sqlite task failed: {e}")))?
    }

    // Spin has no threads; the host call runs inline.
    #[cfg(target_arch = "wasm32")]
    async fn run<T, F>(&self, work: F) -> Result<T, DbError>
    where
        F: FnOnce(&Db) -> Result<T, DbError>,
    {
        work(&self.db)
    }
}

fn find_record(db: &Db, scope: &CartScope) -> Result<Option<CartRecord>, DbError> {
    let (column, value) = match &scope.owner_id {
        Some(owner) => ("user_id", owner.as_str()),
        None => ("session_id", scope.session_id.as_str()),
    };
    find_record_by(db, column, value, &scope.cart_key)
}

fn find_record_by(
    db: &Db,
    column: &str,
    value: &str,
    cart_key: &str,
) -> Result<Option<CartRecord>, DbError> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM carts WHERE {column} = ? AND cart_key = ? \
         ORDER BY id LIMIT 1"
    );
    db.query_optional(&sql, params![value, cart_key])
}

fn rows_for(db: &Db, cart_id: i64) -> Result<Vec<CartRow>, DbError> {
    let records: Vec<ItemRecord> = db.query_as(
        "SELECT row_id, product_id, title, price, qty, options FROM cart_items \
         WHERE cart_id = ? ORDER BY id",
        params![cart_id],
    )?;
    records.into_iter().map(CartRow::try_from).collect()
}

fn find_or_create(db: &Db, scope: &CartScope) -> Result<CartRecord, DbError> {
    let now = current_timestamp();
    match find_record(db, scope)? {
        Some(record) => db.execute(
            "UPDATE carts SET user_id = COALESCE(?, user_id), session_id = ?, updated_at = ? \
             WHERE id = ?",
            params![scope.owner_id.clone(), &scope.session_id, now, record.id],
        )?,
        None => {
            db.execute(
                "INSERT INTO carts (user_id, session_id, cart_key, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    scope.owner_id.clone(),
                    &scope.session_id,
                    &scope.cart_key,
                    now,
                    now
                ],
            )?;
            debug!(
                owner = ?scope.owner_id,
                session = %scope.session_id,
                cart_key = %scope.cart_key,
                "created cart record"
            );
        }
    }
    find_record(db, scope)?.ok_or(DbError::NotFound)
}

fn upsert_row(db: &Db, cart_id: i64, row: &CartRow) -> Result<(), DbError> {
    let options = serde_json::to_string(&row.options)?;
    db.execute(
        "INSERT INTO cart_items (cart_id, row_id, product_id, title, price, qty, options) \
         VALUES (?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(cart_id, row_id, product_id) DO UPDATE SET \
         title = excluded.title, price = excluded.price, qty = excluded.qty, \
         options = excluded.options",
        params![
            cart_id,
            &row.row_id,
            &row.product_id,
            &row.name,
            row.unit_price,
            row.quantity,
            options
        ],
    )
}

fn update_row(db: &Db, cart_id: i64, row: &CartRow) -> Result<(), DbError> {
    let existing = db.query(
        "SELECT id FROM cart_items WHERE cart_id = ? AND row_id = ?",
        params![cart_id, &row.row_id],
    )?;
    if existing.is_empty() {
        return Err(DbError::NotFound);
    }

    let options = serde_json::to_string(&row.options)?;
    db.execute(
        "UPDATE cart_items SET title = ?, price = ?, qty = ?, options = ? \
         WHERE cart_id = ? AND row_id = ?",
        params![
            &row.name,
            row.unit_price,
            row.quantity,
            options,
            cart_id,
            &row.row_id
        ],
    )
}

fn count_rows(db: &Db, cart_id: i64) -> Result<u64, DbError> {
    let count: Count = db.query_one(
        "SELECT COUNT(*) AS n FROM cart_items WHERE cart_id = ?",
        params![cart_id],
    )?;
    Ok(count.n.max(0) as u64)
}

fn delete_record(db: &Db, cart_id: i64) -> Result<(), DbError> {
    db.execute("DELETE FROM cart_items WHERE cart_id = ?", params![cart_id])?;
    db.execute("DELETE FROM carts WHERE id = ?", params![cart_id])
}

fn find_by_owner(db: &Db, owner_id: &str, cart_key: &str) -> Result<Option<StoredCart>, DbError> {
    let Some(record) = find_record_by(db, "user_id", owner_id, cart_key)? else {
        return Ok(None);
    };
    let rows = rows_for(db, record.id)?;
    Ok(Some(StoredCart { record, rows }))
}

#[async_trait]
impl CartRepository for SqliteCartRepository {
    async fn find_or_create(&self, scope: &CartScope) -> Result<CartRecord, DbError> {
        let scope = scope.clone();
        self.run(move |db| find_or_create(db, &scope)).await
    }

    async fn upsert_row(&self, cart_id: i64, row: &CartRow) -> Result<(), DbError> {
        let row = row.clone();
        self.run(move |db| upsert_row(db, cart_id, &row)).await
    }

    async fn update_row(&self, cart_id: i64, row: &CartRow) -> Result<(), DbError> {
        let row = row.clone();
        self.run(move |db| update_row(db, cart_id, &row)).await
    }

    async fn delete_row(&self, cart_id: i64, row_id: &str) -> Result<(), DbError> {
        let row_id = row_id.to_string();
        self.run(move |db| {
            db.execute(
                "DELETE FROM cart_items WHERE cart_id = ? AND row_id = ?",
                params![cart_id, &row_id],
            )
        })
        .await
    }

    async fn count_rows(&self, cart_id: i64) -> Result<u64, DbError> {
        self.run(move |db| count_rows(db, cart_id)).await
    }

    async fn touch(&self, cart_id: i64) -> Result<(), DbError> {
        self.run(move |db| {
            db.execute(
                "UPDATE carts SET updated_at = ? WHERE id = ?",
                params![current_timestamp(), cart_id],
            )
        })
        .await
    }

    async fn delete_record(&self, cart_id: i64) -> Result<(), DbError> {
        self.run(move |db| delete_record(db, cart_id)).await
    }

    async fn find_by_owner(
        &self,
        owner_id: &str,
        cart_key: &str,
    ) -> Result<Option<StoredCart>, DbError> {
        let owner_id = owner_id.to_string();
        let cart_key = cart_key.to_string();
        self.run(move |db| find_by_owner(db, &owner_id, &cart_key))
            .await
    }
}
