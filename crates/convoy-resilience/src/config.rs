//! Configuration for the resilience layer

use std::time::Duration;

/// Circuit breaker configuration, applied per failure-tracking key.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,

    /// How long an open circuit rejects calls before admitting a probe
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

/// Retry policy for a single wrapped call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first (minimum 1)
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub initial_delay: Duration,

    /// Upper bound on any single delay
    pub max_delay: Duration,

    /// Growth factor between attempts
    pub backoff_multiplier: u32,

    /// Perturb delays to avoid synchronized retries
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Base delay before the given 1-based attempt, without jitter.
    ///
    /// Attempt 1 runs immediately; attempt n waits
    /// `initial_delay * multiplier^(n-2)`, capped at `max_delay`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = u64::from(self.backoff_multiplier).saturating_pow(attempt - 2);
        let millis = (self.initial_delay.as_millis() as u64)
            .saturating_mul(factor)
            .min(self.max_delay.as_millis() as u64);
        Duration::from_millis(millis)
    }
}

/// Rate limiter policy for throttling responses.
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    /// Backoff retries before the throttling error is surfaced
    pub max_retries: u32,

    /// First backoff window
    pub initial_backoff: Duration,

    /// Upper bound on any backoff window
    pub max_backoff: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}
