//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use crate::domain::identity::Identity;
use chrono::{DateTime, FixedOffset, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Port for obtaining current actor-local time.
///
/// All time used by the engine flows through this port: epoch-millisecond
/// timestamps, the actor-local calendar date for daily rollover, and the
/// seconds remaining until local midnight for the daily-ceiling retry hint.
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Current actor-local time.
    fn now(&self) -> DateTime<FixedOffset>;

    /// Current time as epoch milliseconds.
    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// Actor-local calendar date, formatted `YYYY-MM-DD`.
    fn today(&self) -> String {
        self.now().format("%Y-%m-%d").to_string()
    }

    /// Whole seconds until the next actor-local midnight.
    fn seconds_until_midnight(&self) -> i64 {
        let now = self.now();
        let tomorrow = now.date_naive().succ_opt().unwrap_or(now.date_naive());
        let midnight = tomorrow.and_time(NaiveTime::MIN);
        (midnight - now.naive_local()).num_seconds().max(0)
    }
}

/// Error from a backing key/value store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend rejected or failed the operation
    Backend(String),
    /// The operation did not complete within its bounded timeout
    Timeout,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Backend(msg) => write!(f, "store backend error: {msg}"),
            StoreError::Timeout => write!(f, "store operation timed out"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Port for one backing key/value store tier.
///
/// Tiers expose blocking `get`/`set` with string keys and string-serialized
/// (JSON-compatible) values. The tiered store composes an ordered list of
/// these and absorbs their failures; adapters report errors honestly and let
/// the chain decide what to do with them.
pub trait KeyValueStore: Send + Sync + Debug {
    /// Read a value, `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Short tier name for log lines.
    fn name(&self) -> &'static str;
}

/// Port for the composed, fail-open persistence chain.
///
/// This is the surface the admission engine reads and writes through. Unlike
/// [`KeyValueStore`], it never errors: a read that fails on every tier reports
/// the key as absent (the caller synthesizes defaults), and a write reports
/// whether any tier accepted it. A storage outage must never block commerce.
pub trait AdmissionStore: Send + Sync + Debug {
    /// Read a value, `None` when absent or when every tier failed.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value to every reachable tier. True if at least one tier
    /// accepted the write; callers must tolerate best-effort persistence.
    fn set(&self, key: &str, value: &str) -> bool;

    /// Whether a remote synced tier is configured and currently reachable.
    /// Diagnostics only, never consulted by policy.
    fn remote_available(&self) -> bool {
        false
    }
}

/// Error from the order ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger could not be reached
    Unavailable,
    /// The ledger rejected or failed the query
    Query(String),
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::Unavailable => write!(f, "order ledger unavailable"),
            LedgerError::Query(msg) => write!(f, "order ledger query failed: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

/// Ledger status of an order, as adapters should classify it.
///
/// An order is "open" while it still occupies one of the active-order slots
/// counted by the admission ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Accepted,
    #[serde(alias = "picking")]
    Preparing,
    Ready,
    OutForDelivery,
    Delivered,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Whether the order still counts toward the active-order ceiling.
    pub fn is_open(&self) -> bool {
        !matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Completed | OrderStatus::Cancelled
        )
    }
}

/// Port for querying the authoritative order ledger.
///
/// Implementations return the ids of orders in non-terminal states whose
/// owning-user field equals `ledger_user_id` (see [`OrderStatus::is_open`]).
/// The engine only performs this lookup for identities that carry a ledger
/// user id; ledger failures are absorbed fail-open by the caller.
pub trait ActiveOrderSource: Send + Sync + Debug {
    /// List open order ids belonging to `ledger_user_id`.
    fn list_open_orders(&self, ledger_user_id: &str) -> Result<Vec<String>, LedgerError>;
}

/// Port for one identity resolution strategy.
///
/// Strategies are evaluated in order by the resolver; the first one to
/// return `Some` wins. A strategy returns `None` when its identity tier is
/// not available for the current actor.
pub trait IdentitySource: Send + Sync + Debug {
    /// Attempt to resolve an identity at this strategy's strength tier.
    fn resolve(&self) -> Option<Identity>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_statuses() {
        assert!(OrderStatus::Pending.is_open());
        assert!(OrderStatus::Accepted.is_open());
        assert!(OrderStatus::Preparing.is_open());
        assert!(OrderStatus::Ready.is_open());
        assert!(OrderStatus::OutForDelivery.is_open());

        assert!(!OrderStatus::Delivered.is_open());
        assert!(!OrderStatus::Completed.is_open());
        assert!(!OrderStatus::Cancelled.is_open());
    }

    #[test]
    fn test_status_decodes_legacy_picking_alias() {
        let status: OrderStatus = serde_json::from_str(r#""picking""#).unwrap();
        assert_eq!(status, OrderStatus::Preparing);

        let status: OrderStatus = serde_json::from_str(r#""out_for_delivery""#).unwrap();
        assert_eq!(status, OrderStatus::OutForDelivery);
    }

    #[test]
    fn test_store_error_display() {
        assert_eq!(
            StoreError::Backend("boom".to_string()).to_string(),
            "store backend error: boom"
        );
        assert_eq!(StoreError::Timeout.to_string(), "store operation timed out");
    }
}
