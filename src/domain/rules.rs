//! Time-window arithmetic for the admission rules.
//!
//! Pure functions over epoch-millisecond timestamp lists. The engine owns the
//! rule ordering; these helpers own the window math.

use std::time::Duration;

/// The oldest timestamp within `window` of `now_ms`, if any.
pub fn oldest_within(timestamps: &[i64], now_ms: i64, window: Duration) -> Option<i64> {
    let cutoff = now_ms - window.as_millis() as i64;
    timestamps.iter().copied().filter(|&ts| ts > cutoff).min()
}

/// Seconds a caller must wait before the minimum-interval rule passes, or
/// `None` if no timestamp falls within the interval.
///
/// The wait is measured from the oldest qualifying timestamp and rounded up
/// to whole seconds so a retry is never one second early.
pub fn interval_retry_secs(timestamps: &[i64], now_ms: i64, min_interval: Duration) -> Option<i64> {
    let oldest = oldest_within(timestamps, now_ms, min_interval)?;
    let remaining_ms = min_interval.as_millis() as i64 - (now_ms - oldest);
    Some((remaining_ms.max(0) + 999) / 1000)
}

/// How many timestamps fall within `window` of `now_ms`.
pub fn count_within(timestamps: &[i64], now_ms: i64, window: Duration) -> usize {
    let cutoff = now_ms - window.as_millis() as i64;
    timestamps.iter().filter(|&&ts| ts > cutoff).count()
}
