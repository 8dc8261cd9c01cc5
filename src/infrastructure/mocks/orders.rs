//! Scriptable order ledger for tests.

use crate::application::ports::{ActiveOrderSource, LedgerError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Ledger double returning a scripted set of open orders, or an outage.
#[derive(Debug, Default)]
pub struct MockOrderSource {
    open_orders: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl MockOrderSource {
    /// Healthy ledger with no open orders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the open orders every user will be reported as having.
    pub fn set_open_orders(&self, orders: Vec<String>) {
        *self.lock() = orders;
    }

    /// Make every subsequent query fail with `LedgerError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.open_orders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ActiveOrderSource for MockOrderSource {
    fn list_open_orders(&self, _ledger_user_id: &str) -> Result<Vec<String>, LedgerError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable);
        }
        Ok(self.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_orders() {
        let source = MockOrderSource::new();
        assert_eq!(source.list_open_orders("u1").unwrap(), Vec::<String>::new());

        source.set_open_orders(vec!["o1".to_string(), "o2".to_string()]);
        assert_eq!(source.list_open_orders("u1").unwrap().len(), 2);
    }

    #[test]
    fn test_outage() {
        let source = MockOrderSource::new();
        source.set_failing(true);
        assert_eq!(
            source.list_open_orders("u1"),
            Err(LedgerError::Unavailable)
        );

        source.set_failing(false);
        assert!(source.list_open_orders("u1").is_ok());
    }
}
