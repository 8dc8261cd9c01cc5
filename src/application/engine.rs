//! The admission engine: policy core of the abuse-prevention system.
//!
//! Combines cached history, freshly-fetched open-order counts, and a fixed
//! rule chain to decide whether a new order may be placed, and records
//! placements, completions, and cancellation exemptions.
//!
//! ## Fail-open posture
//!
//! Every failure path in `can_place_order` resolves to `allowed = true`:
//! store outages synthesize a default history, ledger outages count zero open
//! orders, and any unexpected panic inside the rule chain is caught and
//! converted into a bare allow. Blocking legitimate commerce is judged worse
//! than occasionally admitting one extra order; this engine is an advisory
//! speed-bump, not a hard security control.

use crate::application::cache::HistoryCache;
use crate::application::config::AdmissionConfig;
use crate::application::locks::IdentityLocks;
use crate::application::ports::{ActiveOrderSource, AdmissionStore, Clock};
use crate::application::resolver::IdentityResolver;
use crate::domain::decision::RateLimitResult;
use crate::domain::identity::Identity;
use crate::domain::rules;
use std::panic;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

const EXEMPTION_REASON: &str = "recent cancellation";

/// Error returned when building an `AdmissionEngine` fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// No storage chain was provided
    MissingStore,
    /// No order ledger source was provided
    MissingOrderSource,
    /// The admission configuration is unusable
    InvalidConfig(String),
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::MissingStore => write!(f, "a store is required"),
            BuildError::MissingOrderSource => write!(f, "an active-order source is required"),
            BuildError::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for BuildError {}

/// Builder for constructing an [`AdmissionEngine`].
#[derive(Debug, Default)]
pub struct AdmissionEngineBuilder {
    store: Option<Arc<dyn AdmissionStore>>,
    orders: Option<Arc<dyn ActiveOrderSource>>,
    clock: Option<Arc<dyn Clock>>,
    resolver: Option<IdentityResolver>,
    config: Option<AdmissionConfig>,
    device_id: Option<String>,
}

impl AdmissionEngineBuilder {
    /// Set the persistence chain (required).
    pub fn with_store(mut self, store: Arc<dyn AdmissionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the order ledger source (required).
    pub fn with_order_source(mut self, orders: Arc<dyn ActiveOrderSource>) -> Self {
        self.orders = Some(orders);
        self
    }

    /// Override the clock. Defaults to the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the identity resolution chain. Defaults to a resolver pinned to
    /// one generated session identity, so every operation of the engine is
    /// keyed consistently even without a configured chain.
    pub fn with_identity_resolver(mut self, resolver: IdentityResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Override the admission limits.
    pub fn with_config(mut self, config: AdmissionConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the current device fingerprint, tracked into every history record.
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Build the engine.
    pub fn build(self) -> Result<AdmissionEngine, BuildError> {
        let store = self.store.ok_or(BuildError::MissingStore)?;
        let orders = self.orders.ok_or(BuildError::MissingOrderSource)?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(crate::infrastructure::clock::SystemClock::new()));
        let config = self.config.unwrap_or_default();
        config.validate().map_err(BuildError::InvalidConfig)?;

        let cache = HistoryCache::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            &config,
            self.device_id,
        );

        Ok(AdmissionEngine {
            cache,
            store,
            orders,
            clock,
            resolver: self.resolver.unwrap_or_else(IdentityResolver::single_session),
            locks: IdentityLocks::new(),
            config,
        })
    }
}

/// Decides, for the current actor, whether a new order may be placed right
/// now, and records the state behind that decision.
///
/// One engine instance is owned by the application's composition root with
/// its store, ledger source, and clock injected; tests inject fakes for all
/// three.
#[derive(Debug)]
pub struct AdmissionEngine {
    cache: HistoryCache,
    store: Arc<dyn AdmissionStore>,
    orders: Arc<dyn ActiveOrderSource>,
    clock: Arc<dyn Clock>,
    resolver: IdentityResolver,
    locks: IdentityLocks,
    config: AdmissionConfig,
}

impl AdmissionEngine {
    /// Start building an engine.
    pub fn builder() -> AdmissionEngineBuilder {
        AdmissionEngineBuilder::default()
    }

    /// The identity the engine currently resolves for the actor.
    pub fn identity(&self) -> Identity {
        self.resolver.resolve()
    }

    /// Whether the actor carries a platform-verified identity. Diagnostics
    /// only, never consulted by policy.
    pub fn has_strong_identity(&self) -> bool {
        self.resolver.resolve().is_strong()
    }

    /// Whether a remote synced storage tier is configured and reachable.
    /// Diagnostics only, never consulted by policy.
    pub fn remote_tier_available(&self) -> bool {
        self.store.remote_available()
    }

    /// Decide whether a new order may be placed right now.
    ///
    /// Runs the rule chain in fixed order: exemption token, active-order
    /// ceiling, minimum interval, daily ceiling, burst check. Never returns
    /// an error; any unexpected internal failure fails open.
    ///
    /// This path is read-mostly; the identity lock is taken only for the
    /// brief open-order write-back, never across the ledger query. Callers
    /// that go on to place an order should prefer
    /// [`try_place_order`](Self::try_place_order), which holds the
    /// per-identity lock across check and record.
    pub fn can_place_order(&self) -> RateLimitResult {
        let identity = self.resolver.resolve();
        match panic::catch_unwind(panic::AssertUnwindSafe(|| self.evaluate(&identity, false))) {
            Ok(result) => result,
            Err(_) => {
                warn!(identity = %identity, "admission check panicked; failing open");
                RateLimitResult::allow_fail_open()
            }
        }
    }

    /// Check and record a placement as one serialized operation.
    ///
    /// Holds the per-identity lock across the read-decide-write sequence, so
    /// two concurrent attempts by the same identity cannot both pass the
    /// check. On an allowed exempted placement, the exemption token is
    /// consumed so it cannot be replayed.
    pub fn try_place_order(&self, order_id: &str) -> RateLimitResult {
        let identity = self.resolver.resolve();
        let key = identity.key();
        let lock = self.locks.handle(&key);
        let _guard = hold(&lock);

        let result =
            match panic::catch_unwind(panic::AssertUnwindSafe(|| self.evaluate(&identity, true))) {
            Ok(result) => result,
            Err(_) => {
                // Fail open, but record nothing: the state path just failed
                warn!(identity = %identity, "admission check panicked; failing open");
                return RateLimitResult::allow_fail_open();
            }
        };

        if result.allowed {
            self.record_placement_locked(&key, order_id);
            if result.exemption_reason.is_some() {
                self.consume_exemption_locked(&key);
            }
        }
        result
    }

    /// Record a successful placement for the current identity.
    pub fn record_order_placement(&self, order_id: &str) {
        let key = self.resolver.resolve().key();
        let lock = self.locks.handle(&key);
        let _guard = hold(&lock);
        self.record_placement_locked(&key, order_id);
    }

    /// Record that the ledger reported a terminal state for an order.
    pub fn record_order_completion(&self, order_id: &str) {
        let key = self.resolver.resolve().key();
        let lock = self.locks.handle(&key);
        let _guard = hold(&lock);

        let mut history = self.cache.get_history(&key);
        history.remove_active(order_id);
        self.cache.put_history(&key, history);
    }

    /// Grant a one-shot exemption after an order cancellation.
    ///
    /// The token lets the customer re-order without waiting out the normal
    /// interval, for a bounded validity window.
    pub fn grant_cancellation_exemption(&self, order_id: &str) {
        let key = self.resolver.resolve().key();
        let lock = self.locks.handle(&key);
        let _guard = hold(&lock);

        let expires_at = self.clock.now_ms() + self.config.exemption_validity.as_millis() as i64;
        let mut history = self.cache.get_history(&key);
        history.grant_exemption(order_id, expires_at);
        self.cache.put_history(&key, history);
        debug!(identity = key, order_id, "cancellation exemption granted");
    }

    /// Mark the exemption token as spent.
    ///
    /// Must be called exactly once after an exempted placement succeeds, to
    /// prevent the same grant being replayed within its validity window.
    pub fn use_exemption_token(&self) {
        let key = self.resolver.resolve().key();
        let lock = self.locks.handle(&key);
        let _guard = hold(&lock);
        self.consume_exemption_locked(&key);
    }

    fn record_placement_locked(&self, key: &str, order_id: &str) {
        let mut history = self.cache.get_history(key);
        history.record_placement(
            order_id,
            self.clock.now_ms(),
            &self.clock.today(),
            self.config.timestamp_retention,
        );
        self.cache.put_history(key, history);
    }

    fn consume_exemption_locked(&self, key: &str) {
        let mut history = self.cache.get_history(key);
        if history.consume_exemption() {
            self.cache.put_history(key, history);
        }
    }

    /// Overwrite the advisory open-order list with the ledger's fresh one.
    ///
    /// The record is re-loaded under the identity lock just before writing:
    /// the ledger query can park a check for a while, and a placement
    /// recorded meanwhile must survive this write-back.
    fn sync_open_orders(&self, key: &str, open: Vec<String>, locked: bool) {
        if locked {
            self.sync_open_orders_locked(key, open);
        } else {
            let lock = self.locks.handle(key);
            let _guard = hold(&lock);
            self.sync_open_orders_locked(key, open);
        }
    }

    fn sync_open_orders_locked(&self, key: &str, open: Vec<String>) {
        let mut history = self.cache.get_history(key);
        history.active_order_ids = open;
        self.cache.put_history(key, history);
    }

    /// The rule chain, in fixed order. Called under `catch_unwind`.
    ///
    /// `locked` says whether the caller already holds this identity's lock;
    /// the open-order write-back takes it otherwise.
    fn evaluate(&self, identity: &Identity, locked: bool) -> RateLimitResult {
        let key = identity.key();
        let now_ms = self.clock.now_ms();

        // Step 0: load, with rollover and device tracking applied on read
        let history = self.cache.get_history(&key);

        // Step 1: a fresh cancellation bypasses every later rule
        if history.exemption_usable(now_ms) {
            debug!(identity = %identity, "exemption token active, bypassing rules");
            return RateLimitResult::allow_exempt(EXEMPTION_REASON);
        }

        // Step 2: the live ledger is authoritative, the cached list advisory
        let open = self.open_orders(identity);
        let count = open.len();
        self.sync_open_orders(&key, open, locked);

        if count >= self.config.max_active_orders {
            return RateLimitResult::deny(format!(
                "You already have {count} active order(s). Please wait until they are completed."
            ))
            .with_active_orders(count);
        }

        // Step 3: minimum spacing between placements
        if let Some(retry) = rules::interval_retry_secs(
            &history.order_timestamps,
            now_ms,
            self.config.min_order_interval,
        ) {
            let minutes = (retry + 59) / 60;
            return RateLimitResult::deny(format!(
                "Please wait {minutes} more minute(s) before placing another order."
            ))
            .with_retry_after(retry);
        }

        // Step 4: daily ceiling, reset at actor-local midnight
        if history.daily_order_count >= self.config.max_daily_orders {
            return RateLimitResult::deny(format!(
                "Daily limit of {} orders reached. The limit resets at midnight.",
                self.config.max_daily_orders
            ))
            .with_retry_after(self.clock.seconds_until_midnight());
        }

        // Step 5: burst pattern
        let recent = rules::count_within(
            &history.order_timestamps,
            now_ms,
            self.config.suspicious_window,
        );
        if recent >= self.config.suspicious_threshold {
            return RateLimitResult::deny(
                "Too many orders in a short period. Please try again later.".to_string(),
            )
            .with_retry_after(self.config.suspicious_retry.as_secs() as i64);
        }

        RateLimitResult::allow(count)
    }

    /// Open orders from the ledger, or empty on any soft failure.
    ///
    /// Only identities carrying a ledger user id can be queried; the ceiling
    /// never triggers for the others. A ledger outage also counts zero, so
    /// the ceiling cannot trigger during one.
    fn open_orders(&self, identity: &Identity) -> Vec<String> {
        let Some(user_id) = identity.ledger_user_id() else {
            return Vec::new();
        };
        match self.orders.list_open_orders(user_id) {
            Ok(ids) => ids,
            Err(e) => {
                warn!(identity = %identity, error = %e, "open-order lookup failed; counting zero");
                Vec::new()
            }
        }
    }
}

/// Lock, recovering from poisoning: the guarded state is store-backed and
/// re-normalized on every load, so a panicked writer cannot corrupt it.
fn hold(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
