//! # order-throttle
//!
//! Order admission control for commerce apps: decides whether an actor may
//! place another order right now, using identity resolution, tiered
//! persistence, and a fixed chain of rate-limit rules.
//!
//! This crate is the abuse-prevention layer in front of an order ledger. It
//! is deliberately **fail-open**: when storage is unreachable, the ledger is
//! down, or a rule panics, the answer is "allow". Blocking a legitimate
//! customer is judged worse than occasionally admitting one extra order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use order_throttle::{
//!     ActiveOrderSource, AdmissionEngineBuilder, FileStore, LedgerError, TieredStore,
//! };
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct LedgerClient;
//!
//! impl ActiveOrderSource for LedgerClient {
//!     fn list_open_orders(&self, _ledger_user_id: &str) -> Result<Vec<String>, LedgerError> {
//!         // Query your order backend here
//!         Ok(vec![])
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let local = Arc::new(FileStore::open("orders.json")?);
//!     let engine = AdmissionEngineBuilder::default()
//!         .with_store(Arc::new(TieredStore::local(local)))
//!         .with_order_source(Arc::new(LedgerClient))
//!         .build()?;
//!
//!     let decision = engine.can_place_order();
//!     if decision.allowed {
//!         // ...place the order with the backend, then:
//!         engine.record_order_placement("order-123");
//!     } else if let Some(reason) = decision.reason {
//!         println!("{reason} (retry in {:?}s)", decision.retry_after_seconds);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! For a race-free check-and-record in one step, use
//! [`AdmissionEngine::try_place_order`](application::engine::AdmissionEngine::try_place_order),
//! which holds the per-identity lock across the whole decision.
//!
//! ## The Rule Chain
//!
//! Rules run in a fixed order; the first one that denies wins, each deny
//! carrying a human-readable reason and (where it makes sense) a
//! `retry_after_seconds` hint:
//!
//! 1. **Cancellation exemption** — an unused, unexpired exemption token
//!    (granted when the actor's previous order was cancelled) bypasses every
//!    limit once.
//! 2. **Active-order ceiling** — at most N orders simultaneously open in the
//!    ledger (default 2).
//! 3. **Minimum interval** — a cool-down between consecutive placements
//!    (default 300s).
//! 4. **Daily ceiling** — at most N placements per actor-local calendar day
//!    (default 20); resets at the actor's local midnight.
//! 5. **Burst guard** — too many placements inside a sliding window
//!    (default 5 per 30 minutes) earns a fixed cool-down.
//!
//! ## Identity Resolution
//!
//! Actors are identified by the strongest available tier: a
//! platform-verified chat-client user id, then a linked backend account id,
//! then a random per-session token. Only linked accounts can be checked
//! against the ledger's active-order ceiling; the other rules apply to every
//! tier. See [`IdentityResolver`] and the sources in
//! [`infrastructure::identity`].
//!
//! ## Storage Tiers
//!
//! History lives in a [`TieredStore`]: an optional remote synced tier (Redis,
//! feature `redis-storage`) over a local durable tier ([`FileStore`] or
//! [`InMemoryStore`]). Reads fall through tiers in order; writes mirror to
//! every reachable tier. Each tier carries a [`CircuitBreaker`] so a failing
//! backend is skipped for a recovery window instead of paying its timeout on
//! every decision. A short-TTL in-process cache ([`HistoryCache`]) sits in
//! front of the chain.
//!
//! ## Feature Flags
//!
//! - `redis-storage` — the [`RedisStore`](infrastructure::redis_store::RedisStore)
//!   remote tier (pulls in `redis` and `tokio`).
//! - `test-helpers` — exports the mock clock, store, and ledger used by this
//!   crate's own tests, for use in downstream integration tests.

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    decision::RateLimitResult,
    history::{ExemptionToken, OrderHistory},
    identity::Identity,
};

pub use application::{
    cache::{HistoryCache, HISTORY_KEY_PREFIX},
    config::AdmissionConfig,
    engine::{AdmissionEngine, AdmissionEngineBuilder, BuildError},
    ports::{
        ActiveOrderSource, AdmissionStore, Clock, IdentitySource, KeyValueStore, LedgerError,
        OrderStatus, StoreError,
    },
    resolver::IdentityResolver,
};

pub use infrastructure::{
    breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState},
    clock::SystemClock,
    file::FileStore,
    fingerprint::{DeviceFingerprint, DeviceSignals, DEVICE_ID_KEY},
    identity::{
        standard_resolver, ChatClientSource, LinkedAccountSource, SessionTokenSource,
        LINKED_USER_KEY, SESSION_TOKEN_KEY,
    },
    memory::InMemoryStore,
    store::TieredStore,
};

#[cfg(feature = "redis-storage")]
pub use infrastructure::redis_store::{RedisStore, RedisStoreConfig};

#[cfg(any(test, feature = "test-helpers"))]
pub use infrastructure::mocks::{FlakyStore, MockClock, MockOrderSource};
