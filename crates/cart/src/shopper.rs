//! Who owns the current cart.

use cart_cache::SessionId;
use cart_db::CartScope;
use serde::{Deserialize, Serialize};

/// Source of the current owner and session.
pub trait IdentityProvider: Send + Sync {
    /// Authenticated owner, if any.
    fn current_owner_id(&self) -> Option<String>;

    /// Session of the current request.
    fn current_session_id(&self) -> String;

    /// Durable-store scope for this identity, on the default cart key.
    fn cart_scope(&self) -> CartScope {
        match self.current_owner_id() {
            Some(owner_id) => CartScope::owner(owner_id, self.current_session_id()),
            None => CartScope::anonymous(self.current_session_id()),
        }
    }
}

/// A shopper browsing the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shopper {
    /// Guest tracked by session only.
    Anonymous {
        session_id: SessionId,
    },
    /// Logged-in customer.
    Authenticated {
        id: String,
        session_id: SessionId,
    },
}

impl Shopper {
    pub fn anonymous(session_id: impl Into<SessionId>) -> Self {
        Shopper::Anonymous {
            session_id: session_id.into(),
        }
    }

    pub fn authenticated(id: impl Into<String>, session_id: impl Into<SessionId>) -> Self {
        Shopper::Authenticated {
            id: id.into(),
            session_id: session_id.into(),
        }
    }

    /// Guest with a freshly generated session.
    pub fn guest() -> Self {
        Self::anonymous(SessionId::generate())
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Shopper::Authenticated { .. })
    }

    pub fn session_id(&self) -> &SessionId {
        match self {
            Shopper::Anonymous { session_id } | Shopper::Authenticated { session_id, .. } => {
                session_id
            }
        }
    }

    /// Log in, keeping the current session.
    pub fn login(self, id: impl Into<String>) -> Self {
        match self {
            Shopper::Anonymous { session_id } | Shopper::Authenticated { session_id, .. } => {
                Shopper::Authenticated {
                    id: id.into(),
                    session_id,
                }
            }
        }
    }
}

impl IdentityProvider for Shopper {
    fn current_owner_id(&self) -> Option<String> {
        match self {
            Shopper::Authenticated { id, .. } => Some(id.clone()),
            Shopper::Anonymous { .. } => None,
        }
    }

    fn current_session_id(&self) -> String {
        self.session_id().as_str().to_string()
    }
}
