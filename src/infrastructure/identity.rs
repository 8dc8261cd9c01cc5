//! Identity resolution sources.
//!
//! Concrete strategies for the resolver's ordered fallback chain, strongest
//! first: a platform-verified user id from the hosting chat-client, a
//! backend user id cached in the device-durable store, and a per-session
//! random token persisted in the session-scoped store.

use crate::application::ports::{IdentitySource, KeyValueStore};
use crate::application::resolver::{random_session_token, IdentityResolver};
use crate::domain::identity::Identity;
use std::sync::Arc;
use tracing::warn;

/// Well-known key the linked backend user id is cached under.
pub const LINKED_USER_KEY: &str = "order_linked_user_id";

/// Well-known key the session token is persisted under, in the session store.
pub const SESSION_TOKEN_KEY: &str = "order_session_token";

/// Platform-verified numeric user id handed over by the hosting chat-client.
///
/// The id is captured at construction; the host validates it before the
/// engine ever sees it.
#[derive(Debug)]
pub struct ChatClientSource {
    user_id: Option<i64>,
}

impl ChatClientSource {
    /// Wrap the host-provided user id, if any.
    pub fn new(user_id: Option<i64>) -> Self {
        Self { user_id }
    }
}

impl IdentitySource for ChatClientSource {
    fn resolve(&self) -> Option<Identity> {
        self.user_id.map(|telegram_id| Identity::Strong { telegram_id })
    }
}

/// Backend user id established by an earlier account link, cached in the
/// device-durable store.
#[derive(Debug)]
pub struct LinkedAccountSource {
    store: Arc<dyn KeyValueStore>,
}

impl LinkedAccountSource {
    /// Read linked ids from the device-durable store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

impl IdentitySource for LinkedAccountSource {
    fn resolve(&self) -> Option<Identity> {
        match self.store.get(LINKED_USER_KEY) {
            Ok(Some(local_user_id)) if !local_user_id.is_empty() => {
                Some(Identity::Linked { local_user_id })
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "linked user id read failed, falling to weaker identity");
                None
            }
        }
    }
}

/// Per-session random token, generated once and persisted for the session's
/// lifetime. Always resolves, making it the chain's terminal strategy.
#[derive(Debug)]
pub struct SessionTokenSource {
    store: Arc<dyn KeyValueStore>,
}

impl SessionTokenSource {
    /// Persist tokens in the session-scoped store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

impl IdentitySource for SessionTokenSource {
    fn resolve(&self) -> Option<Identity> {
        match self.store.get(SESSION_TOKEN_KEY) {
            Ok(Some(session_token)) if !session_token.is_empty() => {
                return Some(Identity::Anonymous { session_token });
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "session token read failed, generating fresh"),
        }

        let session_token = random_session_token();
        if let Err(e) = self.store.set(SESSION_TOKEN_KEY, &session_token) {
            warn!(error = %e, "session token write failed, token will not persist");
        }
        Some(Identity::Anonymous { session_token })
    }
}

/// The standard three-tier resolution chain.
pub fn standard_resolver(
    chat_user_id: Option<i64>,
    local_store: Arc<dyn KeyValueStore>,
    session_store: Arc<dyn KeyValueStore>,
) -> IdentityResolver {
    IdentityResolver::new(vec![
        Arc::new(ChatClientSource::new(chat_user_id)),
        Arc::new(LinkedAccountSource::new(local_store)),
        Arc::new(SessionTokenSource::new(session_store)),
    ])
}
