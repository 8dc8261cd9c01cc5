//! Tiered key/value persistence with silent fallback.
//!
//! `TieredStore` composes an ordered list of backing stores: an optional
//! remote synced tier first, then the device-durable local tier. Reads try
//! tiers in order and fall through on error or absence; writes go to every
//! reachable tier and succeed if any tier accepts. A read that fails on all
//! tiers reports the key as absent, so callers synthesize defaults instead of
//! erroring: a storage outage must never block commerce.
//!
//! Each tier carries a circuit breaker. A tier that keeps failing is skipped
//! for a recovery window rather than paying its timeout on every admission
//! decision.

use crate::application::ports::{AdmissionStore, KeyValueStore};
use crate::infrastructure::breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug)]
struct Tier {
    store: Arc<dyn KeyValueStore>,
    breaker: CircuitBreaker,
    remote: bool,
}

impl Tier {
    fn new(store: Arc<dyn KeyValueStore>, breaker_config: &CircuitBreakerConfig, remote: bool) -> Self {
        Self {
            store,
            breaker: CircuitBreaker::with_config(breaker_config.clone()),
            remote,
        }
    }
}

/// Ordered chain of backing stores with fail-open semantics.
#[derive(Debug)]
pub struct TieredStore {
    tiers: Vec<Tier>,
}

impl TieredStore {
    /// A chain with only a local durable tier.
    pub fn local(local: Arc<dyn KeyValueStore>) -> Self {
        Self::build(None, local, CircuitBreakerConfig::default())
    }

    /// A chain preferring a remote synced tier, falling back to local.
    pub fn with_remote(remote: Arc<dyn KeyValueStore>, local: Arc<dyn KeyValueStore>) -> Self {
        Self::build(Some(remote), local, CircuitBreakerConfig::default())
    }

    /// Like [`with_remote`](Self::with_remote) with custom breaker tuning.
    pub fn with_remote_and_breaker(
        remote: Arc<dyn KeyValueStore>,
        local: Arc<dyn KeyValueStore>,
        breaker_config: CircuitBreakerConfig,
    ) -> Self {
        Self::build(Some(remote), local, breaker_config)
    }

    fn build(
        remote: Option<Arc<dyn KeyValueStore>>,
        local: Arc<dyn KeyValueStore>,
        breaker_config: CircuitBreakerConfig,
    ) -> Self {
        let mut tiers = Vec::with_capacity(2);
        if let Some(remote) = remote {
            tiers.push(Tier::new(remote, &breaker_config, true));
        }
        tiers.push(Tier::new(local, &breaker_config, false));
        Self { tiers }
    }
}

impl AdmissionStore for TieredStore {
    fn get(&self, key: &str) -> Option<String> {
        for tier in &self.tiers {
            if !tier.breaker.allow_request() {
                debug!(tier = tier.store.name(), key, "tier circuit open, skipping");
                continue;
            }
            match tier.store.get(key) {
                Ok(Some(value)) => {
                    tier.breaker.record_success();
                    return Some(value);
                }
                Ok(None) => {
                    // Absent on this tier; a lower tier may still hold it
                    tier.breaker.record_success();
                }
                Err(e) => {
                    tier.breaker.record_failure();
                    warn!(tier = tier.store.name(), key, error = %e, "tier read failed, falling through");
                }
            }
        }
        None
    }

    fn set(&self, key: &str, value: &str) -> bool {
        let mut any_ok = false;
        for tier in &self.tiers {
            if !tier.breaker.allow_request() {
                debug!(tier = tier.store.name(), key, "tier circuit open, skipping write");
                continue;
            }
            match tier.store.set(key, value) {
                Ok(()) => {
                    tier.breaker.record_success();
                    any_ok = true;
                }
                Err(e) => {
                    tier.breaker.record_failure();
                    warn!(tier = tier.store.name(), key, error = %e, "tier write failed");
                }
            }
        }
        any_ok
    }

    fn remote_available(&self) -> bool {
        self.tiers
            .iter()
            .any(|tier| tier.remote && tier.breaker.state() != CircuitState::Open)
    }
}
