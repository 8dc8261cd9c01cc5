//! In-memory key/value store.
//!
//! Backs the session-scoped tier (cleared when the process ends, matching a
//! session store's lifetime) and most tests.

use crate::application::ports::{KeyValueStore, StoreError};
use dashmap::DashMap;

/// DashMap-backed store. Never fails.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    map: DashMap<String, String>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value directly, bypassing the port. Test convenience.
    pub fn seed(&self, key: &str, value: &str) {
        self.map.insert(key.to_string(), value.to_string());
    }

    /// Read a value directly, bypassing the port. Test convenience.
    pub fn seeded(&self, key: &str) -> Option<String> {
        self.map.get(key).map(|entry| entry.value().clone())
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.map.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let store = InMemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
        assert_eq!(store.len(), 1);
    }
}
