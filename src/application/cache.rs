//! Short-TTL in-process cache in front of the tiered store.
//!
//! The cache exists to avoid redundant tier reads within a request burst: a
//! single checkout interaction can trigger several admission checks in quick
//! succession, and each store read may touch a remote tier. Entries are valid
//! for a configurable TTL (tens of seconds); expiry is measured against the
//! injected clock so tests can drive it.
//!
//! On a cache miss the loaded record is normalized before it is returned:
//! stale timestamps are pruned, the daily counter is rolled over if the
//! calendar date changed, and the current device fingerprint is tracked. The
//! record is written back only when normalization changed it.

use crate::application::config::AdmissionConfig;
use crate::application::ports::{AdmissionStore, Clock};
use crate::domain::history::OrderHistory;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Prefix of the composite storage key; the full key is this plus the
/// resolved identity.
pub const HISTORY_KEY_PREFIX: &str = "order_limits_";

#[derive(Debug, Clone)]
struct CacheEntry {
    history: OrderHistory,
    valid_until_ms: i64,
}

/// TTL cache over the tiered store, keyed by resolved identity.
#[derive(Debug)]
pub struct HistoryCache {
    store: Arc<dyn AdmissionStore>,
    clock: Arc<dyn Clock>,
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    retention: Duration,
    max_device_ids: usize,
    device_id: Option<String>,
}

impl HistoryCache {
    /// Create a cache over `store`.
    ///
    /// `device_id` is the current device fingerprint, tracked into every
    /// record loaded through this cache; pass `None` when the embedder has no
    /// fingerprint for this actor.
    pub fn new(
        store: Arc<dyn AdmissionStore>,
        clock: Arc<dyn Clock>,
        config: &AdmissionConfig,
        device_id: Option<String>,
    ) -> Self {
        Self {
            store,
            clock,
            entries: DashMap::new(),
            ttl: config.cache_ttl,
            retention: config.timestamp_retention,
            max_device_ids: config.max_device_ids,
            device_id,
        }
    }

    fn storage_key(identity_key: &str) -> String {
        format!("{HISTORY_KEY_PREFIX}{identity_key}")
    }

    /// Load the history for an identity, via cache or store.
    ///
    /// Always succeeds: an absent or corrupt record yields a fresh default,
    /// which normalization then stamps with today's date.
    pub fn get_history(&self, identity_key: &str) -> OrderHistory {
        let now_ms = self.clock.now_ms();

        if let Some(entry) = self.entries.get(identity_key) {
            if now_ms < entry.valid_until_ms {
                return entry.history.clone();
            }
        }

        let mut history = self.load(identity_key);

        let mut changed = history.prune_timestamps(now_ms, self.retention);
        changed |= history.roll_daily(&self.clock.today());
        if let Some(device_id) = &self.device_id {
            changed |= history.track_device(device_id, self.max_device_ids);
        }
        if changed {
            self.persist(identity_key, &history);
        }

        self.entries.insert(
            identity_key.to_string(),
            CacheEntry {
                history: history.clone(),
                valid_until_ms: now_ms + self.ttl.as_millis() as i64,
            },
        );
        history
    }

    /// Persist an updated history and refresh the cache entry.
    ///
    /// The retention invariant is re-applied on every write. The store write
    /// is best-effort; a total write failure is logged and the cached copy
    /// keeps serving until its TTL expires.
    pub fn put_history(&self, identity_key: &str, mut history: OrderHistory) {
        let now_ms = self.clock.now_ms();
        history.prune_timestamps(now_ms, self.retention);

        self.persist(identity_key, &history);
        self.entries.insert(
            identity_key.to_string(),
            CacheEntry {
                history,
                valid_until_ms: now_ms + self.ttl.as_millis() as i64,
            },
        );
    }

    fn load(&self, identity_key: &str) -> OrderHistory {
        match self.store.get(&Self::storage_key(identity_key)) {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(history) => history,
                Err(e) => {
                    warn!(
                        identity = identity_key,
                        error = %e,
                        "discarding corrupt order history record"
                    );
                    OrderHistory::default()
                }
            },
            None => {
                debug!(identity = identity_key, "no persisted history, starting fresh");
                OrderHistory::default()
            }
        }
    }

    fn persist(&self, identity_key: &str, history: &OrderHistory) {
        let encoded = match serde_json::to_string(history) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(identity = identity_key, error = %e, "failed to encode order history");
                return;
            }
        };
        if !self.store.set(&Self::storage_key(identity_key), &encoded) {
            warn!(
                identity = identity_key,
                "order history write failed on every tier"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::KeyValueStore;
    use crate::infrastructure::memory::InMemoryStore;
    use crate::infrastructure::mocks::MockClock;
    use crate::infrastructure::store::TieredStore;
    use chrono::DateTime;

    fn noon() -> DateTime<chrono::FixedOffset> {
        DateTime::parse_from_rfc3339("2025-06-15T12:00:00+03:00").unwrap()
    }

    fn cache_with(
        device_id: Option<String>,
    ) -> (HistoryCache, Arc<InMemoryStore>, Arc<MockClock>) {
        let backing = Arc::new(InMemoryStore::new());
        let store = Arc::new(TieredStore::local(backing.clone()));
        let clock = Arc::new(MockClock::new(noon()));
        let cache = HistoryCache::new(store, clock.clone(), &AdmissionConfig::default(), device_id);
        (cache, backing, clock)
    }

    #[test]
    fn test_first_access_creates_normalized_default() {
        let (cache, backing, _clock) = cache_with(Some("fp_test".to_string()));

        let history = cache.get_history("tg_42");
        assert_eq!(history.last_reset_date, "2025-06-15");
        assert_eq!(history.device_ids, vec!["fp_test"]);
        assert_eq!(history.daily_order_count, 0);

        // Normalization changed the default record, so it was written back
        let raw = backing.get("order_limits_tg_42").unwrap().unwrap();
        assert!(raw.contains("2025-06-15"));
    }

    #[test]
    fn test_cache_hit_within_ttl_skips_store() {
        let (cache, backing, _clock) = cache_with(None);

        let first = cache.get_history("tg_42");
        // Poison the store behind the cache's back; a hit must not see it
        backing.set("order_limits_tg_42", "not json").unwrap();

        let second = cache.get_history("tg_42");
        assert_eq!(first, second);
    }

    #[test]
    fn test_expired_entry_reloads_from_store() {
        let (cache, backing, clock) = cache_with(None);

        cache.get_history("tg_42");
        backing
            .set(
                "order_limits_tg_42",
                r#"{"dailyOrderCount":7,"lastResetDate":"2025-06-15"}"#,
            )
            .unwrap();

        clock.advance(Duration::from_secs(31));
        let history = cache.get_history("tg_42");
        assert_eq!(history.daily_order_count, 7);
    }

    #[test]
    fn test_corrupt_record_degrades_to_default() {
        let (cache, backing, _clock) = cache_with(None);
        backing.set("order_limits_tg_42", "{{{").unwrap();

        let history = cache.get_history("tg_42");
        assert_eq!(history.daily_order_count, 0);
        assert!(history.order_timestamps.is_empty());
    }

    #[test]
    fn test_rollover_happens_on_expired_reload() {
        let (cache, _backing, clock) = cache_with(None);

        let mut history = cache.get_history("tg_42");
        history.daily_order_count = 20;
        cache.put_history("tg_42", history);

        // Cross midnight and let the TTL lapse
        clock.advance(Duration::from_secs(13 * 60 * 60));
        let history = cache.get_history("tg_42");
        assert_eq!(history.daily_order_count, 0);
        assert_eq!(history.last_reset_date, "2025-06-16");
    }

    #[test]
    fn test_put_prunes_stale_timestamps() {
        let (cache, _backing, clock) = cache_with(None);

        let now_ms = clock.now_ms();
        let mut history = OrderHistory::default();
        history.order_timestamps = vec![now_ms - 25 * 60 * 60 * 1000, now_ms];
        cache.put_history("tg_42", history);

        let history = cache.get_history("tg_42");
        assert_eq!(history.order_timestamps, vec![now_ms]);
    }
}
