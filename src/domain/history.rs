//! Per-identity order history record.
//!
//! `OrderHistory` is the single persisted record behind every admission
//! decision. It is created lazily on first access, mutated on every check
//! (for lazy rollover and device tracking) and on placement/completion/
//! exemption calls, and never explicitly deleted.
//!
//! Invariants maintained by the mutators here:
//! - `order_timestamps` never contains entries older than the retention
//!   window at the moment of any read or write
//! - `daily_order_count` is zeroed exactly once per calendar-date rollover,
//!   detected lazily on access
//! - `device_ids` holds at most `max_devices` distinct entries, FIFO-evicted
//! - a used or expired exemption token never grants exemption (staleness is
//!   checked; the token is not required to be deleted)

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One-shot, time-boxed bypass of the normal admission rules, granted after
/// an order cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExemptionToken {
    /// The cancelled order that earned the exemption
    pub order_id: String,
    /// Expiry, epoch milliseconds
    pub expires_at: i64,
    /// Set once the exemption has been spent on a placement
    pub used: bool,
}

/// Admission state for a single resolved identity.
///
/// Persisted as a JSON object under `"order_limits_" + identity`. Field names
/// are camelCase on the wire for compatibility with records written by the
/// storefront client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderHistory {
    /// Last known open order ids. Advisory cache of ledger state; the live
    /// ledger is authoritative and overwrites this on every check.
    pub active_order_ids: Vec<String>,
    /// Placement times (epoch ms) within the rolling retention window
    pub order_timestamps: Vec<i64>,
    /// Orders placed since `last_reset_date`
    pub daily_order_count: u32,
    /// Actor-local calendar date (`YYYY-MM-DD`) the daily counter was last zeroed
    pub last_reset_date: String,
    /// Most recent distinct device fingerprints seen for this identity
    pub device_ids: Vec<String>,
    /// Cancellation exemption, if one has been granted
    pub cancel_exemption_token: Option<ExemptionToken>,
}

impl OrderHistory {
    /// Drop timestamps older than `retention` relative to `now_ms`.
    ///
    /// Returns true if anything was removed.
    pub fn prune_timestamps(&mut self, now_ms: i64, retention: Duration) -> bool {
        let cutoff = now_ms - retention.as_millis() as i64;
        let before = self.order_timestamps.len();
        self.order_timestamps.retain(|&ts| ts >= cutoff);
        self.order_timestamps.len() != before
    }

    /// Zero the daily counter if the calendar date has rolled over since the
    /// last reset. `today` is the actor-local date formatted `YYYY-MM-DD`.
    ///
    /// Returns true if a rollover happened.
    pub fn roll_daily(&mut self, today: &str) -> bool {
        if self.last_reset_date == today {
            return false;
        }
        self.daily_order_count = 0;
        self.last_reset_date = today.to_string();
        true
    }

    /// Record that `device_id` was seen for this identity.
    ///
    /// Appends the id if it is new and FIFO-evicts down to `max_devices`.
    /// Returns true if the list changed.
    pub fn track_device(&mut self, device_id: &str, max_devices: usize) -> bool {
        if self.device_ids.iter().any(|d| d == device_id) {
            return false;
        }
        self.device_ids.push(device_id.to_string());
        while self.device_ids.len() > max_devices {
            self.device_ids.remove(0);
        }
        true
    }

    /// Whether an unexpired, unused exemption token is present.
    pub fn exemption_usable(&self, now_ms: i64) -> bool {
        match &self.cancel_exemption_token {
            Some(token) => !token.used && token.expires_at > now_ms,
            None => false,
        }
    }

    /// Grant a fresh exemption token for a cancelled order.
    ///
    /// Replaces any previous token, stale or not.
    pub fn grant_exemption(&mut self, order_id: &str, expires_at: i64) {
        self.cancel_exemption_token = Some(ExemptionToken {
            order_id: order_id.to_string(),
            expires_at,
            used: false,
        });
    }

    /// Mark the exemption token as spent.
    ///
    /// Returns true if a token was present and not already used.
    pub fn consume_exemption(&mut self) -> bool {
        match &mut self.cancel_exemption_token {
            Some(token) if !token.used => {
                token.used = true;
                true
            }
            _ => false,
        }
    }

    /// Record a successful placement: append the timestamp (then prune),
    /// append the order id to the advisory open list, and bump the daily
    /// counter after the same rollover check the admission path performs.
    pub fn record_placement(
        &mut self,
        order_id: &str,
        now_ms: i64,
        today: &str,
        retention: Duration,
    ) {
        self.order_timestamps.push(now_ms);
        self.prune_timestamps(now_ms, retention);
        self.active_order_ids.push(order_id.to_string());
        self.roll_daily(today);
        self.daily_order_count += 1;
    }

    /// Remove an order from the advisory open list.
    ///
    /// Returns true if it was present.
    pub fn remove_active(&mut self, order_id: &str) -> bool {
        let before = self.active_order_ids.len();
        self.active_order_ids.retain(|id| id != order_id);
        self.active_order_ids.len() != before
    }
}
