//! Retry budget and exponential backoff curve for page fetches.

use std::time::Duration;

/// Bounded retry policy: up to `max_retries` additional attempts after the
/// first, sleeping `backoff_base * 2^attempt` between attempts.
///
/// # Backoff schedule (example with `backoff_base = 1s`)
///
/// | Failed attempt | Sleep before next attempt |
/// |----------------|---------------------------|
/// | 0 (initial)    | 1 × 2^0 = 1 s             |
/// | 1              | 1 × 2^1 = 2 s             |
/// | 2              | 1 × 2^2 = 4 s             |
///
/// With `max_retries = 3` a page is requested at most 4 times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            max_retries,
            backoff_base,
        }
    }

    /// A policy that never retries and never sleeps.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Total number of requests the policy allows for one page.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether another attempt is allowed after failed attempt `attempt`
    /// (zero-based).
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Sleep before the attempt following failed attempt `attempt`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        // Shift capped so extreme retry counts saturate instead of overflowing.
        self.backoff_base.saturating_mul(1u32 << attempt.min(20))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn backoff_saturates_on_extreme_attempts() {
        let policy = RetryPolicy::new(u32::MAX, Duration::MAX);
        assert_eq!(policy.backoff(1_000), Duration::MAX);
    }

    #[test]
    fn budget_allows_max_retries_plus_one_attempts() {
        let policy = RetryPolicy::new(2, Duration::ZERO);
        assert_eq!(policy.max_attempts(), 3);
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(1));
        assert!(!policy.should_retry(2));
    }

    #[test]
    fn no_retry_policy_allows_single_attempt() {
        let policy = RetryPolicy::no_retry();
        assert_eq!(policy.max_attempts(), 1);
        assert!(!policy.should_retry(0));
        assert_eq!(policy.backoff(0), Duration::ZERO);
    }
}
