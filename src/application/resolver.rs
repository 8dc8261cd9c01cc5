//! Ordered-fallback identity resolution.
//!
//! Resolution tries each configured [`IdentitySource`] in order and takes the
//! first identity offered. The ordering is a deliberate trade-off: a
//! platform-verified id gives real persistent limits, a locally-cached
//! backend id is next best, and an anonymous session token still throttles
//! the actor for the session's duration. Resolution has no failure path; if
//! every source declines, a session identity is synthesized on the spot.

use crate::application::ports::IdentitySource;
use crate::domain::identity::Identity;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Arc;
use tracing::warn;

/// Resolves the current actor's identity through an ordered strategy chain.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    sources: Vec<Arc<dyn IdentitySource>>,
}

impl IdentityResolver {
    /// Create a resolver over `sources`, strongest first.
    pub fn new(sources: Vec<Arc<dyn IdentitySource>>) -> Self {
        Self { sources }
    }

    /// A resolver pinned to one freshly generated session identity.
    ///
    /// Every `resolve` call returns the same token, so all checks and
    /// records land under one key. This is the engine's default when no
    /// chain is configured; synthesizing a new token per call would key
    /// every operation differently and quietly disable every limit.
    pub fn single_session() -> Self {
        Self::new(vec![Arc::new(PinnedIdentity(Identity::Anonymous {
            session_token: random_session_token(),
        }))])
    }

    /// Resolve an identity. Always returns a value.
    pub fn resolve(&self) -> Identity {
        for source in &self.sources {
            if let Some(identity) = source.resolve() {
                return identity;
            }
        }
        warn!("no identity source resolved; synthesizing an unpersisted session identity");
        Identity::Anonymous {
            session_token: random_session_token(),
        }
    }
}

#[derive(Debug)]
struct PinnedIdentity(Identity);

impl IdentitySource for PinnedIdentity {
    fn resolve(&self) -> Option<Identity> {
        Some(self.0.clone())
    }
}

/// A fresh random session token.
pub(crate) fn random_session_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Fixed(Option<Identity>);

    impl IdentitySource for Fixed {
        fn resolve(&self) -> Option<Identity> {
            self.0.clone()
        }
    }

    #[test]
    fn test_first_source_wins() {
        let resolver = IdentityResolver::new(vec![
            Arc::new(Fixed(Some(Identity::Strong { telegram_id: 42 }))),
            Arc::new(Fixed(Some(Identity::Anonymous {
                session_token: "x".to_string(),
            }))),
        ]);

        assert_eq!(resolver.resolve(), Identity::Strong { telegram_id: 42 });
    }

    #[test]
    fn test_falls_through_declining_sources() {
        let resolver = IdentityResolver::new(vec![
            Arc::new(Fixed(None)),
            Arc::new(Fixed(Some(Identity::Linked {
                local_user_id: "u1".to_string(),
            }))),
        ]);

        assert_eq!(
            resolver.resolve(),
            Identity::Linked {
                local_user_id: "u1".to_string()
            }
        );
    }

    #[test]
    fn test_synthesizes_session_identity_when_all_decline() {
        let resolver = IdentityResolver::new(vec![Arc::new(Fixed(None))]);

        match resolver.resolve() {
            Identity::Anonymous { session_token } => assert_eq!(session_token.len(), 16),
            other => panic!("expected anonymous identity, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_chain_still_resolves() {
        let resolver = IdentityResolver::new(vec![]);
        assert!(matches!(resolver.resolve(), Identity::Anonymous { .. }));
    }

    #[test]
    fn test_single_session_resolver_is_stable() {
        let resolver = IdentityResolver::single_session();

        let first = resolver.resolve();
        assert!(matches!(first, Identity::Anonymous { .. }));
        assert_eq!(first, resolver.resolve());

        // Distinct resolvers still get distinct tokens
        assert_ne!(first, IdentityResolver::single_session().resolve());
    }
}
