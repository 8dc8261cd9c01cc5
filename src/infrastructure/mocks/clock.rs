//! Controllable clock for tests.

use crate::application::ports::Clock;
use chrono::{DateTime, FixedOffset};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Clock frozen at an explicit instant, advanced manually.
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<DateTime<FixedOffset>>>,
}

impl MockClock {
    /// Freeze the clock at `start`.
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let delta = chrono::Duration::from_std(delta)
            .unwrap_or_else(|_| chrono::Duration::zero());
        let mut current = self.lock();
        *current += delta;
    }

    /// Jump the clock to an absolute instant.
    pub fn set(&self, instant: DateTime<FixedOffset>) {
        *self.lock() = instant;
    }

    fn lock(&self) -> MutexGuard<'_, DateTime<FixedOffset>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.lock()
    }
}
