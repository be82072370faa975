//! Exponential retry backoff.

use std::time::Duration;

use herald_core::config::DeliveryConfig;

/// `base * 2^(retry_count - 1)`, capped at `max`.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    /// Create a backoff policy.
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Policy from the delivery configuration.
    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self::new(
            Duration::from_secs(config.retry_base_delay_seconds),
            Duration::from_secs(config.retry_max_delay_seconds),
        )
    }

    /// Delay before the next attempt after `retry_count` failures.
    pub fn delay(&self, retry_count: i32) -> Duration {
        let exponent = retry_count.saturating_sub(1).clamp(0, 31) as u32;
        self.base
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubles_then_caps() {
        let backoff = Backoff::new(Duration::from_secs(30), Duration::from_secs(3600));
        assert_eq!(backoff.delay(1), Duration::from_secs(30));
        assert_eq!(backoff.delay(2), Duration::from_secs(60));
        assert_eq!(backoff.delay(3), Duration::from_secs(120));
        assert_eq!(backoff.delay(8), Duration::from_secs(3600));
        assert_eq!(backoff.delay(500), Duration::from_secs(3600));
    }

    #[test]
    fn test_zero_retries_uses_base() {
        let backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(10));
        assert_eq!(backoff.delay(0), Duration::from_secs(5));
    }
}
