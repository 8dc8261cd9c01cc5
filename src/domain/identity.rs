//! Resolved customer identities.
//!
//! An identity is the key under which all admission state for an actor is
//! stored. Identities come in three strength tiers, resolved by an ordered
//! fallback chain (see `infrastructure::identity`): a platform-verified user
//! id, a locally-cached backend user id, or a per-session random token.

use std::fmt;

/// A resolved customer identity.
///
/// The variants are ordered by strength. Stronger identities get real
/// persistent limits; anonymous sessions are throttled too, but only for the
/// lifetime of the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// Platform-verified numeric user id from the hosting chat-client.
    Strong {
        /// Verified numeric user id
        telegram_id: i64,
    },
    /// Previously-established backend user id cached locally.
    Linked {
        /// Backend (ledger-side) user id
        local_user_id: String,
    },
    /// Per-session random token, generated once and persisted for the
    /// session's lifetime.
    Anonymous {
        /// Random session token
        session_token: String,
    },
}

impl Identity {
    /// The string key under which all rate-limit state for this actor is stored.
    pub fn key(&self) -> String {
        match self {
            Identity::Strong { telegram_id } => format!("tg_{telegram_id}"),
            Identity::Linked { local_user_id } => format!("local_{local_user_id}"),
            Identity::Anonymous { session_token } => format!("session_{session_token}"),
        }
    }

    /// Whether this identity is backed by a platform-verified user id.
    pub fn is_strong(&self) -> bool {
        matches!(self, Identity::Strong { .. })
    }

    /// The ledger-side user id, if this identity can be matched against the
    /// order ledger's owning-user field.
    ///
    /// Only `Linked` identities carry one. The ledger indexes orders by its
    /// own user ids, not by platform ids or session tokens, so `Strong` and
    /// `Anonymous` identities cannot be looked up there: their open-order
    /// list is always empty and the active-order ceiling never triggers for
    /// them.
    pub fn ledger_user_id(&self) -> Option<&str> {
        match self {
            Identity::Linked { local_user_id } => Some(local_user_id),
            _ => None,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_prefixes() {
        let strong = Identity::Strong { telegram_id: 42 };
        let linked = Identity::Linked {
            local_user_id: "u123".to_string(),
        };
        let anon = Identity::Anonymous {
            session_token: "abc123".to_string(),
        };

        assert_eq!(strong.key(), "tg_42");
        assert_eq!(linked.key(), "local_u123");
        assert_eq!(anon.key(), "session_abc123");
    }

    #[test]
    fn test_only_linked_identity_maps_to_ledger() {
        let strong = Identity::Strong { telegram_id: 42 };
        let linked = Identity::Linked {
            local_user_id: "u123".to_string(),
        };
        let anon = Identity::Anonymous {
            session_token: "abc".to_string(),
        };

        assert_eq!(strong.ledger_user_id(), None);
        assert_eq!(linked.ledger_user_id(), Some("u123"));
        assert_eq!(anon.ledger_user_id(), None);
    }

    #[test]
    fn test_strength() {
        assert!(Identity::Strong { telegram_id: 1 }.is_strong());
        assert!(!Identity::Anonymous {
            session_token: "t".to_string()
        }
        .is_strong());
    }

    #[test]
    fn test_display_matches_key() {
        let id = Identity::Strong { telegram_id: 7 };
        assert_eq!(id.to_string(), id.key());
    }
}
