//! Tier fallback and circuit breaker behavior through the public API.

use order_throttle::{
    AdmissionStore, CircuitBreakerConfig, FlakyStore, InMemoryStore, TieredStore,
};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_remote_read_preferred_local_is_fallback() {
    let remote = Arc::new(InMemoryStore::new());
    let local = Arc::new(InMemoryStore::new());
    remote.seed("k", "remote");
    local.seed("k", "local");
    local.seed("only-local", "v");

    let store = TieredStore::with_remote(remote, local);
    assert_eq!(store.get("k").as_deref(), Some("remote"));
    assert_eq!(store.get("only-local").as_deref(), Some("v"));
    assert!(store.get("absent").is_none());
}

#[test]
fn test_remote_outage_is_transparent() {
    let remote = Arc::new(FlakyStore::new());
    remote.set_fail_gets(true);
    remote.set_fail_sets(true);
    let local = Arc::new(InMemoryStore::new());

    let store = TieredStore::with_remote(remote, local.clone());

    assert!(store.set("k", "v"));
    assert_eq!(store.get("k").as_deref(), Some("v"));
    assert_eq!(local.seeded("k").as_deref(), Some("v"));
}

#[test]
fn test_open_circuit_stops_touching_remote() {
    let remote = Arc::new(FlakyStore::new());
    remote.set_fail_gets(true);
    remote.set_fail_sets(true);
    let local = Arc::new(InMemoryStore::new());

    let store = TieredStore::with_remote_and_breaker(
        remote.clone(),
        local,
        CircuitBreakerConfig {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(3600),
        },
    );

    for _ in 0..3 {
        store.get("k");
    }
    assert!(!store.remote_available());

    remote.reset_counts();
    for _ in 0..10 {
        store.get("k");
        store.set("k", "v");
    }
    assert_eq!(remote.op_count(), 0);
}

#[test]
fn test_remote_rejoins_after_recovery() {
    let remote = Arc::new(FlakyStore::new());
    remote.set_fail_gets(true);
    let local = Arc::new(InMemoryStore::new());

    let store = TieredStore::with_remote_and_breaker(
        remote.clone(),
        local,
        CircuitBreakerConfig {
            failure_threshold: 2,
            recovery_timeout: Duration::from_millis(20),
        },
    );

    store.get("k");
    store.get("k");
    assert!(!store.remote_available());

    remote.set_fail_gets(false);
    remote.seed("k", "back");
    std::thread::sleep(Duration::from_millis(30));

    assert_eq!(store.get("k").as_deref(), Some("back"));
    assert!(store.remote_available());
}

#[test]
fn test_writes_repopulate_recovered_remote() {
    let remote = Arc::new(FlakyStore::new());
    remote.set_fail_sets(true);
    let local = Arc::new(InMemoryStore::new());

    let store = TieredStore::with_remote(remote.clone(), local);
    assert!(store.set("k", "v1"));
    assert!(remote.seeded("k").is_none());

    remote.set_fail_sets(false);
    assert!(store.set("k", "v2"));
    assert_eq!(remote.seeded("k").as_deref(), Some("v2"));
}
