//! Retry policy for release API calls.
//!
//! Provides configurable retry limits and inter-retry delay,
//! allowing users to tune retry behavior based on network conditions.

use std::time::Duration;

/// Highest retry count accepted from configuration or environment
pub const MAX_RETRIES: u32 = 20;

/// Longest inter-retry delay accepted from configuration or environment
pub const MAX_RETRY_DELAY_MS: u64 = 60_000;

/// Retry behavior shared by every release API call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = try once)
    pub retries: u32,

    /// Fixed delay between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 5,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Create a policy, clamping both values to their maximums
    pub fn new(retries: u32, delay_ms: u64) -> Self {
        Self {
            retries: retries.min(MAX_RETRIES),
            delay: Duration::from_millis(delay_ms.min(MAX_RETRY_DELAY_MS)),
        }
    }

    /// Total attempts this policy allows
    pub fn max_attempts(&self) -> u32 {
        self.retries + 1
    }

    /// Parse a numeric environment value with clamping to maximum
    ///
    /// # Arguments
    /// * `value` - Raw value (e.g., from `SOURCEMAP_RELEASE_RETRIES`)
    /// * `max` - Maximum allowed value (values above this are clamped)
    ///
    /// # Returns
    /// The parsed value clamped to [0, max], or `None` if unset or not a number
    pub(crate) fn parse_clamped(value: Option<String>, max: u64) -> Option<u64> {
        value
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(|v| v.min(max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.retries, 5);
        assert_eq!(policy.delay, Duration::from_millis(1000));
        assert_eq!(policy.max_attempts(), 6);
    }

    #[test]
    fn test_new_clamps_values() {
        let policy = RetryPolicy::new(100, 10 * MAX_RETRY_DELAY_MS);
        assert_eq!(policy.retries, MAX_RETRIES);
        assert_eq!(policy.delay, Duration::from_millis(MAX_RETRY_DELAY_MS));
    }

    #[test]
    fn test_parse_clamped() {
        assert_eq!(RetryPolicy::parse_clamped(Some("3".into()), 20), Some(3));
        assert_eq!(RetryPolicy::parse_clamped(Some(" 50 ".into()), 20), Some(20));
        assert_eq!(RetryPolicy::parse_clamped(Some("many".into()), 20), None);
        assert_eq!(RetryPolicy::parse_clamped(None, 20), None);
    }
}
