//! Session-scoped storage on top of a Key-Value slot.

use crate::{cache_key, Cache, CacheError, KvSlot};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// A unique session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new session ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new cryptographically secure session ID.
    pub fn generate() -> Self {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        use rand::Rng;

        let bytes: [u8; 18] = rand::thread_rng().gen();
        Self(format!("sess_{}", URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Get the session ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Typed storage scoped to one session.
///
/// Every key is namespaced as `session:<id>:<key>`, so several sessions can
/// share one underlying slot without seeing each other's values.
///
/// # Example
///
/// ```rust,ignore
/// use cart_cache::{MemorySlot, Session, SessionId};
///
/// let session = Session::new(SessionId::from("abc123"), MemorySlot::new());
/// session.put("cart_items", &items)?;
/// let items: Option<Vec<LineItem>> = session.get("cart_items")?;
/// session.forget("cart_items")?;
/// ```
pub struct Session<S> {
    id: SessionId,
    cache: Cache<S>,
}

impl<S: KvSlot> Session<S> {
    /// Bind a slot to a session.
    pub fn new(id: SessionId, slot: S) -> Self {
        Self {
            id,
            cache: Cache::new(slot),
        }
    }

    /// The session this store is scoped to.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Get a value stored for this session.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        self.cache.get(&self.scoped_key(key))
    }

    /// Store a value for this session.
    pub fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        self.cache.set(&self.scoped_key(key), value)
    }

    /// Remove a value for this session.
    pub fn forget(&self, key: &str) -> Result<(), CacheError> {
        self.cache.delete(&self.scoped_key(key))
    }

    /// Check if this session holds `key`.
    pub fn has(&self, key: &str) -> Result<bool, CacheError> {
        self.cache.exists(&self.scoped_key(key))
    }

    fn scoped_key(&self, key: &str) -> String {
        cache_key!("session", self.id, key)
    }
}
