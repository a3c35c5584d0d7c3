//! Cart behaviour with a durable store attached.

use async_trait::async_trait;
use cart::prelude::*;
use cart_cache::{MemorySlot, Session, SessionId};
use cart_db::{
    CartRecord, CartRepository, CartRow, CartScope, Db, DbError, MemoryCartRepository,
    SqliteCartRepository, StoredCart, DEFAULT_CART_KEY,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn config() -> CartConfig {
    CartConfig::default().with_tax(0.0).with_database(true)
}

async fn connect(
    shopper: &Shopper,
    slot: &MemorySlot,
    config: CartConfig,
    repo: Arc<dyn CartRepository>,
) -> Cart<MemorySlot> {
    let session = Session::new(shopper.session_id().clone(), slot.clone());
    Cart::connect(session, config, shopper, repo).await
}

/// Repository whose every call fails.
struct FailingRepository;

fn unavailable() -> DbError {
    DbError::OpenError("store unavailable".to_string())
}

#[async_trait]
impl CartRepository for FailingRepository {
    async fn find_or_create(&self, _scope: &CartScope) -> Result<CartRecord, DbError> {
        Err(unavailable())
    }

    async fn upsert_row(&self, _cart_id: i64, _row: &CartRow) -> Result<(), DbError> {
        Err(unavailable())
    }

    async fn update_row(&self, _cart_id: i64, _row: &CartRow) -> Result<(), DbError> {
        Err(unavailable())
    }

    async fn delete_row(&self, _cart_id: i64, _row_id: &str) -> Result<(), DbError> {
        Err(unavailable())
    }

    async fn count_rows(&self, _cart_id: i64) -> Result<u64, DbError> {
        Err(unavailable())
    }

    async fn touch(&self, _cart_id: i64) -> Result<(), DbError> {
        Err(unavailable())
    }

    async fn delete_record(&self, _cart_id: i64) -> Result<(), DbError> {
        Err(unavailable())
    }

    async fn find_by_owner(
        &self,
        _owner_id: &str,
        _cart_key: &str,
    ) -> Result<Option<StoredCart>, DbError> {
        Err(unavailable())
    }
}

/// Repository that answers only after a delay.
struct SlowRepository {
    inner: MemoryCartRepository,
    delay: Duration,
}

#[async_trait]
impl CartRepository for SlowRepository {
    async fn find_or_create(&self, scope: &CartScope) -> Result<CartRecord, DbError> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_or_create(scope).await
    }

    async fn upsert_row(&self, cart_id: i64, row: &CartRow) -> Result<(), DbError> {
        tokio::time::sleep(self.delay).await;
        self.inner.upsert_row(cart_id, row).await
    }

    async fn update_row(&self, cart_id: i64, row: &CartRow) -> Result<(), DbError> {
        tokio::time::sleep(self.delay).await;
        self.inner.update_row(cart_id, row).await
    }

    async fn delete_row(&self, cart_id: i64, row_id: &str) -> Result<(), DbError> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete_row(cart_id, row_id).await
    }

    async fn count_rows(&self, cart_id: i64) -> Result<u64, DbError> {
        tokio::time::sleep(self.delay).await;
        self.inner.count_rows(cart_id).await
    }

    async fn touch(&self, cart_id: i64) -> Result<(), DbError> {
        tokio::time::sleep(self.delay).await;
        self.inner.touch(cart_id).await
    }

    async fn delete_record(&self, cart_id: i64) -> Result<(), DbError> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete_record(cart_id).await
    }

    async fn find_by_owner(
        &self,
        owner_id: &str,
        cart_key: &str,
    ) -> Result<Option<StoredCart>, DbError> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_by_owner(owner_id, cart_key).await
    }
}

#[tokio::test]
async fn test_mutations_are_mirrored() {
    let repo = Arc::new(MemoryCartRepository::new());
    let shopper = Shopper::anonymous("sess-1");
    let mut cart = connect(&shopper, &MemorySlot::new(), config(), repo.clone()).await;

    let shirt = cart
        .add("p1", "Shirt", 10, 2, OptionSet::new().with("size", "L"))
        .await
        .unwrap();
    let mug = cart.add("p2", "Mug", 4, 1, OptionSet::new()).await.unwrap();
    cart.add("p1", "Shirt", 10, 1, OptionSet::new().with("size", "L"))
        .await
        .unwrap();

    let cart_id = cart.durable_sync().unwrap().record().unwrap().id;
    let rows = repo.rows(cart_id);
    assert_eq!(rows.len(), 2);
    let stored_shirt = rows.iter().find(|r| r.row_id == shirt.as_str()).unwrap();
    assert_eq!(stored_shirt.quantity, 3.0);
    assert_eq!(stored_shirt.options.get("size"), Some(&serde_json::json!("L")));

    cart.remove(&mug).await.unwrap();
    assert_eq!(repo.rows(cart_id).len(), 1);
}

#[tokio::test]
async fn test_update_keeps_durable_row_identity() {
    let repo = Arc::new(MemoryCartRepository::new());
    let shopper = Shopper::anonymous("sess-1");
    let mut cart = connect(&shopper, &MemorySlot::new(), config(), repo.clone()).await;

    let row_id = cart
        .add("p1", "Shirt", 10, 1, OptionSet::new().with("size", "L"))
        .await
        .unwrap();
    cart.update(
        &row_id,
        ItemFields::new()
            .quantity(4.0)
            .options(OptionSet::new().with("size", "XL")),
    )
    .await
    .unwrap();

    let cart_id = cart.durable_sync().unwrap().record().unwrap().id;
    let rows = repo.rows(cart_id);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].row_id, row_id.as_str());
    assert_eq!(rows[0].quantity, 4.0);
    assert_eq!(rows[0].options.get("size"), Some(&serde_json::json!("XL")));
}

#[tokio::test]
async fn test_empty_cart_record_is_deleted_and_recreated() {
    let repo = Arc::new(MemoryCartRepository::new());
    let shopper = Shopper::anonymous("sess-1");
    let mut cart = connect(&shopper, &MemorySlot::new(), config(), repo.clone()).await;

    let row_id = cart.add("p1", "Mug", 4, 1, OptionSet::new()).await.unwrap();
    cart.remove(&row_id).await.unwrap();
    assert!(repo.records().is_empty());

    cart.add("p1", "Mug", 4, 1, OptionSet::new()).await.unwrap();
    let records = repo.records();
    assert_eq!(records.len(), 1);
    assert_eq!(repo.rows(records[0].id).len(), 1);
}

#[tokio::test]
async fn test_keep_policy_retains_empty_record() {
    let repo = Arc::new(MemoryCartRepository::new());
    let shopper = Shopper::anonymous("sess-1");
    let config = config().with_empty_cart(EmptyCartPolicy::Keep);
    let mut cart = connect(&shopper, &MemorySlot::new(), config, repo.clone()).await;

    let row_id = cart.add("p1", "Mug", 4, 1, OptionSet::new()).await.unwrap();
    cart.remove(&row_id).await.unwrap();

    let records = repo.records();
    assert_eq!(records.len(), 1);
    assert!(repo.rows(records[0].id).is_empty());
}

#[tokio::test]
async fn test_destroy_deletes_record() {
    let repo = Arc::new(MemoryCartRepository::new());
    let shopper = Shopper::authenticated("user-1", "sess-1");
    let mut cart = connect(&shopper, &MemorySlot::new(), config(), repo.clone()).await;

    cart.add("p1", "Mug", 4, 1, OptionSet::new()).await.unwrap();
    cart.destroy().await.unwrap();

    assert!(cart.content().unwrap().is_empty());
    assert!(repo.records().is_empty());
}

#[tokio::test]
async fn test_database_disabled_skips_store() {
    let repo = Arc::new(MemoryCartRepository::new());
    let shopper = Shopper::anonymous("sess-1");
    let mut cart = connect(
        &shopper,
        &MemorySlot::new(),
        config().with_database(false),
        repo.clone(),
    )
    .await;

    cart.add("p1", "Mug", 4, 1, OptionSet::new()).await.unwrap();
    assert!(cart.durable_sync().is_none());
    assert!(repo.records().is_empty());
}

#[tokio::test]
async fn test_failing_store_does_not_change_results() {
    let shopper = Shopper::authenticated("user-1", "sess-1");
    let mut synced = connect(
        &shopper,
        &MemorySlot::new(),
        config(),
        Arc::new(FailingRepository),
    )
    .await;
    let session = Session::new(SessionId::new("sess-2"), MemorySlot::new());
    let mut plain = Cart::new(session, config().with_database(false));

    for cart in [&mut synced, &mut plain] {
        let a = cart.add("p1", "Lamp", 100, 2, OptionSet::new()).await.unwrap();
        let b = cart
            .add("p2", "Bulb", "2.50", 4, OptionSet::new().with(DISCOUNT_KEY, 0.5))
            .await
            .unwrap();
        cart.update(&a, 3).await.unwrap();
        cart.remove(&b).await.unwrap();
        cart.add("p2", "Bulb", 2.5, 1, OptionSet::new()).await.unwrap();
    }

    assert_eq!(synced.content().unwrap(), plain.content().unwrap());
    assert_eq!(synced.total().unwrap(), plain.total().unwrap());
    assert_eq!(synced.hydrate().await.unwrap(), 0);

    synced.destroy().await.unwrap();
    assert!(synced.content().unwrap().is_empty());
}

#[tokio::test]
async fn test_slow_store_is_bounded_by_timeout() {
    let repo = Arc::new(SlowRepository {
        inner: MemoryCartRepository::new(),
        delay: Duration::from_secs(5),
    });
    let shopper = Shopper::anonymous("sess-1");
    let config = config().with_sync_timeout(Duration::from_millis(20));

    let started = Instant::now();
    let mut cart = connect(&shopper, &MemorySlot::new(), config, repo.clone()).await;
    let row_id = cart.add("p1", "Mug", 4, 2, OptionSet::new()).await.unwrap();
    cart.remove(&row_id).await.unwrap();
    cart.add("p1", "Mug", 4, 1, OptionSet::new()).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(cart.count().unwrap(), 1.0);
    assert!(repo.inner.records().is_empty());
}

#[tokio::test]
async fn test_hydrate_restores_owner_cart_once() {
    let repo = Arc::new(MemoryCartRepository::new());

    // First visit stores two rows.
    let first = Shopper::authenticated("user-1", "sess-1");
    let mut cart = connect(&first, &MemorySlot::new(), config(), repo.clone()).await;
    let shirt = cart
        .add("p1", "Shirt", 10, 2, OptionSet::new().with("size", "L"))
        .await
        .unwrap();
    cart.add("p2", "Mug", 4, 1, OptionSet::new()).await.unwrap();

    // A later visit starts from an empty session.
    let second = Shopper::authenticated("user-1", "sess-2");
    let slot = MemorySlot::new();
    let mut cart = connect(&second, &slot, config(), repo.clone()).await;
    let rows_before = repo.rows(cart.durable_sync().unwrap().record().unwrap().id);

    assert_eq!(cart.hydrate().await.unwrap(), 2);
    assert_eq!(cart.count().unwrap(), 3.0);
    assert_eq!(cart.get(&shirt).unwrap().quantity, 2.0);

    // Hydration does not write rows back.
    let cart_id = cart.durable_sync().unwrap().record().unwrap().id;
    assert_eq!(repo.rows(cart_id), rows_before);

    assert_eq!(cart.hydrate().await.unwrap(), 0);
    assert_eq!(cart.count().unwrap(), 3.0);

    // Emptying the cart does not bring the stored rows back in this session.
    cart.destroy().await.unwrap();
    let mut cart = connect(&second, &slot, config(), repo.clone()).await;
    assert_eq!(cart.hydrate().await.unwrap(), 0);
    assert!(cart.content().unwrap().is_empty());
}

fn names(cart: &Cart<MemorySlot>) -> Vec<String> {
    cart.content()
        .unwrap()
        .into_iter()
        .map(|item| item.name)
        .collect()
}

#[tokio::test]
async fn test_cart_keys_are_stored_separately() {
    let repo = Arc::new(MemoryCartRepository::new());
    let first = Shopper::authenticated("user-1", "sess-1");
    let mut cart = connect(&first, &MemorySlot::new(), config(), repo.clone()).await;
    cart.add("p1", "Shirt", 10, 1, OptionSet::new()).await.unwrap();
    cart.select("wishlist").unwrap();
    cart.add("p2", "Poster", 5, 1, OptionSet::new()).await.unwrap();
    assert_eq!(repo.records().len(), 2);

    let second = Shopper::authenticated("user-1", "sess-2");
    let mut cart = connect(&second, &MemorySlot::new(), config(), repo.clone()).await;
    assert_eq!(cart.hydrate().await.unwrap(), 1);
    assert_eq!(names(&cart), vec!["Shirt"]);

    cart.select("wishlist").unwrap();
    assert_eq!(cart.hydrate().await.unwrap(), 1);
    assert_eq!(names(&cart), vec!["Poster"]);
    assert_eq!(cart.hydrate().await.unwrap(), 0);
}

#[tokio::test]
async fn test_destroying_one_cart_keeps_the_others() {
    let repo = Arc::new(MemoryCartRepository::new());
    let first = Shopper::authenticated("user-1", "sess-1");
    let mut cart = connect(&first, &MemorySlot::new(), config(), repo.clone()).await;
    cart.add("p1", "Shirt", 10, 1, OptionSet::new()).await.unwrap();
    cart.select("wishlist").unwrap();
    cart.add("p2", "Poster", 5, 1, OptionSet::new()).await.unwrap();
    cart.destroy().await.unwrap();

    let second = Shopper::authenticated("user-1", "sess-2");
    let mut cart = connect(&second, &MemorySlot::new(), config(), repo.clone()).await;
    assert_eq!(cart.hydrate().await.unwrap(), 1);
    assert_eq!(names(&cart), vec!["Shirt"]);

    cart.select("wishlist").unwrap();
    assert_eq!(cart.hydrate().await.unwrap(), 0);
}

#[tokio::test]
async fn test_updated_options_are_removable_after_restore() {
    let repo = Arc::new(MemoryCartRepository::new());

    // The stored row keeps its original id after the options change.
    let first = Shopper::authenticated("user-1", "sess-1");
    let mut cart = connect(&first, &MemorySlot::new(), config(), repo.clone()).await;
    let original = cart
        .add("p1", "Shirt", 10, 1, OptionSet::new().with("size", "L"))
        .await
        .unwrap();
    cart.update(
        &original,
        ItemFields::new().options(OptionSet::new().with("size", "XL")),
    )
    .await
    .unwrap();

    // Restoring derives the id from the new options and re-keys the stored row.
    let second = Shopper::authenticated("user-1", "sess-2");
    let mut cart = connect(&second, &MemorySlot::new(), config(), repo.clone()).await;
    assert_eq!(cart.hydrate().await.unwrap(), 1);
    let restored = cart.content().unwrap()[0].row_id().clone();
    assert_ne!(restored, original);

    let cart_id = cart.durable_sync().unwrap().record().unwrap().id;
    let rows = repo.rows(cart_id);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].row_id, restored.as_str());

    cart.remove(&restored).await.unwrap();
    assert_eq!(cart.count().unwrap().to_string(), "0");
    assert!(repo.records().is_empty());

    let third = Shopper::authenticated("user-1", "sess-3");
    let mut cart = connect(&third, &MemorySlot::new(), config(), repo.clone()).await;
    assert_eq!(cart.hydrate().await.unwrap(), 0);
}

#[tokio::test]
async fn test_restore_merges_rows_with_same_identity() {
    let repo = Arc::new(MemoryCartRepository::new());
    let record = repo
        .find_or_create(&CartScope::owner("user-1", "sess-0"))
        .await
        .unwrap();
    let row = |row_id: &str, quantity: f64| CartRow {
        row_id: row_id.into(),
        product_id: "p1".into(),
        name: "Mug".into(),
        unit_price: 4.0,
        quantity,
        options: serde_json::Map::new(),
    };
    repo.upsert_row(record.id, &row("old-a", 1.0)).await.unwrap();
    repo.upsert_row(record.id, &row("old-b", 2.0)).await.unwrap();

    let owner = Shopper::authenticated("user-1", "sess-1");
    let mut cart = connect(&owner, &MemorySlot::new(), config(), repo.clone()).await;
    assert_eq!(cart.hydrate().await.unwrap(), 2);
    assert_eq!(cart.count().unwrap(), 3.0);

    let rows = repo.rows(record.id);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quantity, 3.0);
    assert_eq!(rows[0].row_id, cart.content().unwrap()[0].row_id().as_str());
}

#[tokio::test]
async fn test_hydrate_skips_non_empty_cart_and_guests() {
    let repo = Arc::new(MemoryCartRepository::new());
    let owner = Shopper::authenticated("user-1", "sess-1");
    let mut cart = connect(&owner, &MemorySlot::new(), config(), repo.clone()).await;
    cart.add("p1", "Shirt", 10, 1, OptionSet::new()).await.unwrap();

    // Already has content.
    assert_eq!(cart.hydrate().await.unwrap(), 0);
    assert_eq!(cart.count().unwrap(), 1.0);

    let guest = Shopper::anonymous("sess-9");
    let mut cart = connect(&guest, &MemorySlot::new(), config(), repo.clone()).await;
    assert_eq!(cart.hydrate().await.unwrap(), 0);
}

#[tokio::test]
async fn test_hydrate_skips_invalid_stored_rows() {
    let repo = Arc::new(MemoryCartRepository::new());
    let record = repo
        .find_or_create(&CartScope::owner("user-1", "sess-0"))
        .await
        .unwrap();
    let good = CartRow {
        row_id: "r1".into(),
        product_id: "p1".into(),
        name: "Mug".into(),
        unit_price: 4.0,
        quantity: 2.0,
        options: serde_json::Map::new(),
    };
    let nameless = CartRow {
        row_id: "r2".into(),
        product_id: "p2".into(),
        name: String::new(),
        ..good.clone()
    };
    repo.upsert_row(record.id, &good).await.unwrap();
    repo.upsert_row(record.id, &nameless).await.unwrap();

    let owner = Shopper::authenticated("user-1", "sess-1");
    let mut cart = connect(&owner, &MemorySlot::new(), config(), repo.clone()).await;
    assert_eq!(cart.hydrate().await.unwrap(), 1);

    let content = cart.content().unwrap();
    assert_eq!(content.len(), 1);
    assert_eq!(content[0].product_id.as_str(), "p1");
}

#[tokio::test]
async fn test_sqlite_owner_cart_survives_sessions() {
    let repo = SqliteCartRepository::new(Db::open_in_memory().unwrap());
    repo.migrate().unwrap();
    let repo: Arc<dyn CartRepository> = Arc::new(repo);

    let guest = Shopper::anonymous("sess-1");
    let mut cart = connect(&guest, &MemorySlot::new(), config(), repo.clone()).await;
    cart.add("p9", "Sticker", 1, 1, OptionSet::new()).await.unwrap();

    // An owner's cart is matched by owner only, never by a guest session.
    let owner = guest.login("user-1");
    let mut cart = connect(&owner, &MemorySlot::new(), config(), repo.clone()).await;
    cart.add("p1", "Shirt", 10, 2, OptionSet::new().with("size", "L"))
        .await
        .unwrap();

    let stored = repo
        .find_by_owner("user-1", DEFAULT_CART_KEY)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.rows.len(), 1);
    assert_eq!(stored.rows[0].product_id, "p1");
    assert_eq!(stored.rows[0].quantity, 2.0);

    let later = Shopper::authenticated("user-1", "sess-2");
    let mut cart = connect(&later, &MemorySlot::new(), config(), repo.clone()).await;
    assert_eq!(cart.hydrate().await.unwrap(), 1);
    assert_eq!(cart.total().unwrap(), "20.00");
}
