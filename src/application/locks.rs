//! Per-identity lock table.
//!
//! `can_place_order` followed by `record_order_placement` is a check-then-act
//! sequence: two concurrent placement attempts by the same identity (two
//! browser tabs, two devices) could both pass the check before either records.
//! The engine closes that window by serializing the read-decide-write sequence
//! per identity. There is no cross-identity shared mutable state, so a lock
//! table sharded by identity is sufficient; read-only checks never touch it.

use dashmap::DashMap;
use std::sync::{Arc, Mutex};

/// Lock table keyed by resolved identity.
#[derive(Debug, Default)]
pub struct IdentityLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl IdentityLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock handle for an identity, created on first use.
    ///
    /// Callers hold the returned `Arc` and lock it for the duration of their
    /// read-decide-write sequence.
    pub fn handle(&self, identity_key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(identity_key.to_string())
            .or_default()
            .clone()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_same_identity_shares_a_lock() {
        let locks = IdentityLocks::new();
        let a = locks.handle("tg_42");
        let b = locks.handle("tg_42");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_identities_lock_independently() {
        let locks = IdentityLocks::new();
        let a = locks.handle("tg_42");
        let b = locks.handle("tg_43");
        assert!(!Arc::ptr_eq(&a, &b));

        // Holding one identity's lock must not block another's
        let _guard = a.lock().unwrap();
        assert!(b.try_lock().is_ok());
    }

    #[test]
    fn test_serializes_concurrent_writers() {
        let locks = Arc::new(IdentityLocks::new());
        let counter = Arc::new(Mutex::new(0u32));
        let mut handles = vec![];

        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let counter = Arc::clone(&counter);
            handles.push(thread::spawn(move || {
                let lock = locks.handle("tg_42");
                let _guard = lock.lock().unwrap();
                // Non-atomic read-modify-write, safe only under the lock
                let current = *counter.lock().unwrap();
                thread::yield_now();
                *counter.lock().unwrap() = current + 1;
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*counter.lock().unwrap(), 8);
    }
}
