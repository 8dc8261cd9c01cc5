//! Device fingerprinting.
//!
//! Derives a low-entropy device identifier from environment signals and
//! persists it in the device-durable tier so it survives restarts. This is
//! NOT a security boundary: it only limits casual multi-accounting, not
//! determined evasion, and the admission rules treat it as advisory input.

use crate::application::ports::{Clock, KeyValueStore};
use std::sync::Arc;
use tracing::warn;

/// Well-known key the fingerprint is persisted under.
pub const DEVICE_ID_KEY: &str = "order_device_id";

/// Environment characteristics folded into the fingerprint.
///
/// Collected by the embedder from whatever client context it has (HTTP
/// headers, platform APIs). Missing signals are fine; an all-default value
/// still produces a stable id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSignals {
    pub user_agent: String,
    pub language: String,
    pub color_depth: u16,
    pub screen_width: u32,
    pub screen_height: u32,
    pub timezone_offset_minutes: i32,
    pub touch_support: bool,
    pub cookies_enabled: bool,
}

impl DeviceSignals {
    fn concat(&self) -> String {
        format!(
            "{}|{}|{}|{}x{}|{}|{}|{}",
            self.user_agent,
            self.language,
            self.color_depth,
            self.screen_width,
            self.screen_height,
            self.timezone_offset_minutes,
            self.touch_support,
            self.cookies_enabled,
        )
    }
}

/// Creates and persists the device identifier.
#[derive(Debug)]
pub struct DeviceFingerprint {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl DeviceFingerprint {
    /// Create a fingerprinter over the device-durable store.
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The persisted device id, or a freshly derived one.
    ///
    /// Pass `None` when signal collection itself failed; the id then
    /// derives from the timestamp alone. Never fails: a store read error
    /// just means a new id is derived, and a store write error means the id
    /// will be re-derived next time.
    pub fn get_or_create(&self, signals: Option<&DeviceSignals>) -> String {
        match self.store.get(DEVICE_ID_KEY) {
            Ok(Some(existing)) if !existing.is_empty() => return existing,
            Ok(_) => {}
            Err(e) => warn!(error = %e, "device id read failed, deriving fresh"),
        }

        let now_ms = self.clock.now_ms();
        let id = match signals {
            Some(signals) => derive(signals, now_ms),
            None => fallback_id(now_ms),
        };
        if let Err(e) = self.store.set(DEVICE_ID_KEY, &id) {
            warn!(error = %e, "device id write failed, id will not persist");
        }
        id
    }
}

/// `fp_<hash-base36>_<creation-ms-base36>` over the concatenated signals.
fn derive(signals: &DeviceSignals, now_ms: i64) -> String {
    let mut hash: u32 = 0;
    for byte in signals.concat().bytes() {
        hash = hash.wrapping_mul(31).wrapping_add(byte as u32);
    }
    format!("fp_{}_{}", base36(hash as u64), base36(now_ms as u64))
}

/// `fp_t<creation-ms-base36>` when there are no signals to fold.
fn fallback_id(now_ms: i64) -> String {
    format!("fp_t{}", base36(now_ms as u64))
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ascii")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::InMemoryStore;
    use crate::infrastructure::mocks::{FlakyStore, MockClock};
    use chrono::DateTime;

    fn clock() -> Arc<MockClock> {
        Arc::new(MockClock::new(
            DateTime::parse_from_rfc3339("2025-06-15T12:00:00+03:00").unwrap(),
        ))
    }

    fn signals() -> DeviceSignals {
        DeviceSignals {
            user_agent: "Mozilla/5.0".to_string(),
            language: "en-US".to_string(),
            color_depth: 24,
            screen_width: 1920,
            screen_height: 1080,
            timezone_offset_minutes: -180,
            touch_support: false,
            cookies_enabled: true,
        }
    }

    #[test]
    fn test_format_and_stability() {
        let fp = DeviceFingerprint::new(Arc::new(InMemoryStore::new()), clock());
        let id = fp.get_or_create(Some(&signals()));

        assert!(id.starts_with("fp_"));
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);

        // Same signals at the same instant fold to the same hash half
        let other = DeviceFingerprint::new(Arc::new(InMemoryStore::new()), clock());
        let other_id = other.get_or_create(Some(&signals()));
        assert_eq!(id, other_id);
    }

    #[test]
    fn test_different_signals_differ() {
        let fp = DeviceFingerprint::new(Arc::new(InMemoryStore::new()), clock());
        let a = fp.get_or_create(Some(&signals()));

        let mut changed = signals();
        changed.screen_width = 1280;
        let other = DeviceFingerprint::new(Arc::new(InMemoryStore::new()), clock());
        let b = other.get_or_create(Some(&changed));

        assert_ne!(a, b);
    }

    #[test]
    fn test_persisted_id_is_reused() {
        let store = Arc::new(InMemoryStore::new());
        let fp = DeviceFingerprint::new(store.clone(), clock());

        let first = fp.get_or_create(Some(&signals()));
        // Even with different signals, or none at all, the persisted id wins
        let second = fp.get_or_create(None);
        assert_eq!(first, second);
        assert_eq!(store.seeded(DEVICE_ID_KEY), Some(first));
    }

    #[test]
    fn test_store_failure_still_yields_id() {
        let store = Arc::new(FlakyStore::new());
        store.set_fail_gets(true);
        store.set_fail_sets(true);

        let fp = DeviceFingerprint::new(store, clock());
        let id = fp.get_or_create(Some(&signals()));
        assert!(id.starts_with("fp_"));
    }

    #[test]
    fn test_missing_signals_fall_back_to_timestamp_id() {
        let store = Arc::new(InMemoryStore::new());
        let fp = DeviceFingerprint::new(store.clone(), clock());

        let id = fp.get_or_create(None);
        assert!(id.starts_with("fp_t"));
        assert_eq!(store.seeded(DEVICE_ID_KEY), Some(id));
    }

    #[test]
    fn test_base36() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
        assert_eq!(base36(1295), "zz");
    }
}
