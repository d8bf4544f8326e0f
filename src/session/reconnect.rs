//! Reconnect pacing
//!
//! Retries never stop; the policy only decides how long to wait before the
//! next one. The default retries immediately.

use std::time::Duration;

/// Delay schedule for consecutive connect failures
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay in milliseconds for the 1st, 2nd, ... consecutive failure
    pub backoff_pattern: Vec<u64>,
    /// Delay once the pattern is exhausted
    pub sustained_delay: u64,
}

impl ReconnectPolicy {
    /// Retry at once, every time
    pub fn immediate() -> Self {
        Self::default()
    }

    pub fn new(backoff_pattern: Vec<u64>, sustained_delay: u64) -> Self {
        Self {
            backoff_pattern,
            sustained_delay,
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let index = attempt.saturating_sub(1) as usize;
        let millis = self
            .backoff_pattern
            .get(index)
            .copied()
            .unwrap_or(self.sustained_delay);
        Duration::from_millis(millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_immediate() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy, ReconnectPolicy::immediate());
        for attempt in [1, 2, 10, 10_000] {
            assert_eq!(policy.delay_for(attempt), Duration::ZERO);
        }
    }

    #[test]
    fn test_pattern_then_sustained_delay() {
        let policy = ReconnectPolicy::new(vec![25, 50, 100, 250], 500);

        assert_eq!(policy.delay_for(1), Duration::from_millis(25));
        assert_eq!(policy.delay_for(2), Duration::from_millis(50));
        assert_eq!(policy.delay_for(4), Duration::from_millis(250));
        assert_eq!(policy.delay_for(5), Duration::from_millis(500));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_millis(500));
    }

    #[test]
    fn test_attempt_zero_uses_first_entry() {
        let policy = ReconnectPolicy::new(vec![10], 0);
        assert_eq!(policy.delay_for(0), Duration::from_millis(10));
    }
}
