//! Admission policy configuration.

use std::time::Duration;

/// Tunable limits for the admission rules.
///
/// The defaults match the limits the storefront ships with. All durations are
/// compared against the injected clock, so tests can drive them with a mock.
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    /// Maximum simultaneously open orders per identity
    pub max_active_orders: usize,
    /// Minimum spacing between two placements
    pub min_order_interval: Duration,
    /// Maximum placements per actor-local calendar day
    pub max_daily_orders: u32,
    /// Placements inside `suspicious_window` that trigger the burst rule
    pub suspicious_threshold: usize,
    /// Window the burst rule counts over
    pub suspicious_window: Duration,
    /// Fixed retry hint returned by the burst rule
    pub suspicious_retry: Duration,
    /// How long a cancellation exemption stays valid
    pub exemption_validity: Duration,
    /// Retention window for placement timestamps
    pub timestamp_retention: Duration,
    /// Most recent distinct device fingerprints kept per identity
    pub max_device_ids: usize,
    /// How long a cached history entry stays valid
    pub cache_ttl: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_active_orders: 2,
            min_order_interval: Duration::from_secs(300),
            max_daily_orders: 20,
            suspicious_threshold: 5,
            suspicious_window: Duration::from_secs(30 * 60),
            suspicious_retry: Duration::from_secs(1800),
            exemption_validity: Duration::from_secs(600),
            timestamp_retention: Duration::from_secs(24 * 60 * 60),
            max_device_ids: 5,
            cache_ttl: Duration::from_secs(30),
        }
    }
}

impl AdmissionConfig {
    /// Check the configuration for values the engine cannot operate with.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.max_active_orders == 0 {
            return Err("max_active_orders must be greater than 0".to_string());
        }
        if self.max_device_ids == 0 {
            return Err("max_device_ids must be greater than 0".to_string());
        }
        if self.timestamp_retention < self.min_order_interval
            || self.timestamp_retention < self.suspicious_window
        {
            return Err(
                "timestamp_retention must cover min_order_interval and suspicious_window"
                    .to_string(),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AdmissionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_active_orders_rejected() {
        let config = AdmissionConfig {
            max_active_orders: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retention_shorter_than_windows_rejected() {
        let config = AdmissionConfig {
            timestamp_retention: Duration::from_secs(60),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
