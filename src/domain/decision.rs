//! Admission decision values.

/// Outcome of an admission check.
///
/// Returned by every `can_place_order` call and never persisted. The UI only
/// ever sees this value; the engine converts all internal failures into an
/// allowed decision (fail-open) rather than surfacing an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Whether a new order may be placed right now
    pub allowed: bool,
    /// Human-readable denial reason
    pub reason: Option<String>,
    /// Seconds until the caller should retry
    pub retry_after_seconds: Option<i64>,
    /// Open-order count observed during the check
    pub active_orders: Option<usize>,
    /// Why the normal rules were bypassed, when they were
    pub exemption_reason: Option<String>,
}

impl RateLimitResult {
    /// Allow, carrying the observed open-order count.
    pub fn allow(active_orders: usize) -> Self {
        Self {
            allowed: true,
            reason: None,
            retry_after_seconds: None,
            active_orders: Some(active_orders),
            exemption_reason: None,
        }
    }

    /// Allow because an exemption token bypassed the rules.
    pub fn allow_exempt(exemption_reason: &str) -> Self {
        Self {
            allowed: true,
            reason: None,
            retry_after_seconds: None,
            active_orders: None,
            exemption_reason: Some(exemption_reason.to_string()),
        }
    }

    /// Allow because an internal failure must not block commerce.
    ///
    /// Carries no reason or counts; the check did not complete.
    pub fn allow_fail_open() -> Self {
        Self {
            allowed: true,
            reason: None,
            retry_after_seconds: None,
            active_orders: None,
            exemption_reason: None,
        }
    }

    /// Deny with a human-readable reason.
    pub fn deny(reason: String) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            retry_after_seconds: None,
            active_orders: None,
            exemption_reason: None,
        }
    }

    /// Attach a retry hint in seconds.
    pub fn with_retry_after(mut self, seconds: i64) -> Self {
        self.retry_after_seconds = Some(seconds);
        self
    }

    /// Attach the observed open-order count.
    pub fn with_active_orders(mut self, count: usize) -> Self {
        self.active_orders = Some(count);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_carries_count() {
        let result = RateLimitResult::allow(1);
        assert!(result.allowed);
        assert_eq!(result.active_orders, Some(1));
        assert!(result.reason.is_none());
    }

    #[test]
    fn test_deny_builders() {
        let result = RateLimitResult::deny("too many orders".to_string())
            .with_retry_after(210)
            .with_active_orders(2);

        assert!(!result.allowed);
        assert_eq!(result.reason.as_deref(), Some("too many orders"));
        assert_eq!(result.retry_after_seconds, Some(210));
        assert_eq!(result.active_orders, Some(2));
    }

    #[test]
    fn test_exempt_allow() {
        let result = RateLimitResult::allow_exempt("recent cancellation");
        assert!(result.allowed);
        assert_eq!(result.exemption_reason.as_deref(), Some("recent cancellation"));
    }

    #[test]
    fn test_fail_open_has_no_details() {
        let result = RateLimitResult::allow_fail_open();
        assert!(result.allowed);
        assert!(result.reason.is_none());
        assert!(result.active_orders.is_none());
    }
}
