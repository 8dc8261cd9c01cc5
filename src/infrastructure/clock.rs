//! Clock adapters for time operations.
//!
//! Provides SystemClock implementation for production use.
//!
//! # Testing
//!
//! See `MockClock` (in `crate::infrastructure::mocks`) for a controllable test
//! clock, available with the `test-helpers` feature or in test builds.

use crate::application::ports::Clock;
use chrono::{DateTime, FixedOffset, Local};

/// System clock reporting the host's local time.
///
/// The admission rules use actor-local calendar dates, so the offset of the
/// returned time decides when the daily counter rolls over.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_reports_current_epoch() {
        let clock = SystemClock::new();
        // Past 2020, and with a plausible millisecond magnitude
        assert!(clock.now_ms() > 1_577_836_800_000);
    }

    #[test]
    fn test_today_format() {
        let clock = SystemClock::new();
        let today = clock.today();
        assert_eq!(today.len(), 10);
        assert_eq!(today.as_bytes()[4], b'-');
        assert_eq!(today.as_bytes()[7], b'-');
    }

    #[test]
    fn test_seconds_until_midnight_in_range() {
        let clock = SystemClock::new();
        let secs = clock.seconds_until_midnight();
        assert!(secs > 0);
        assert!(secs <= 24 * 60 * 60);
    }
}
