//! Fault-injecting key/value store for tests.

use crate::application::ports::{KeyValueStore, StoreError};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory store whose reads and writes can be made to fail on demand.
/// Also counts operations so tests can assert a tier was (not) touched.
#[derive(Debug, Default)]
pub struct FlakyStore {
    map: DashMap<String, String>,
    fail_gets: AtomicBool,
    fail_sets: AtomicBool,
    ops: AtomicUsize,
}

impl FlakyStore {
    /// Healthy, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `get` fail (or heal it again).
    pub fn set_fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `set` fail (or heal it again).
    pub fn set_fail_sets(&self, fail: bool) {
        self.fail_sets.store(fail, Ordering::SeqCst);
    }

    /// Operations attempted since construction or the last reset.
    pub fn op_count(&self) -> usize {
        self.ops.load(Ordering::SeqCst)
    }

    /// Zero the operation counter.
    pub fn reset_counts(&self) {
        self.ops.store(0, Ordering::SeqCst);
    }

    /// Insert a value directly, bypassing fault injection.
    pub fn seed(&self, key: &str, value: &str) {
        self.map.insert(key.to_string(), value.to_string());
    }

    /// Read a value directly, bypassing fault injection.
    pub fn seeded(&self, key: &str) -> Option<String> {
        self.map.get(key).map(|entry| entry.value().clone())
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.ops.fetch_add(1, Ordering::SeqCst);
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected failure".to_string()));
        }
        Ok(self.map.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.ops.fetch_add(1, Ordering::SeqCst);
        if self.fail_sets.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected failure".to_string()));
        }
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_healthy_roundtrip_counts_ops() {
        let store = FlakyStore::new();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(store.op_count(), 2);

        store.reset_counts();
        assert_eq!(store.op_count(), 0);
    }

    #[test]
    fn test_injected_failures() {
        let store = FlakyStore::new();
        store.seed("k", "v");

        store.set_fail_gets(true);
        assert!(store.get("k").is_err());

        store.set_fail_gets(false);
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        store.set_fail_sets(true);
        assert!(store.set("k", "v2").is_err());
        // Failed write leaves the previous value intact
        assert_eq!(store.seeded("k").as_deref(), Some("v"));
    }
}
