//! Retry service with per-key circuit breaking
//!
//! Wraps an async operation in bounded retries with exponential backoff.
//! Every key (endpoint + operation pair) gets its own [`CircuitBreaker`];
//! breakers live in a shared map so failures on one key never starve
//! attempts against another.

use crate::breaker::CircuitBreaker;
use crate::config::{CircuitBreakerConfig, RetryPolicy};
use crate::error::{CallError, ResilienceError, Result};
use convoy_types::CancelToken;
use dashmap::DashMap;
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Successful result of a retried call.
#[derive(Debug, Clone)]
pub struct RetryOutcome<T> {
    /// The wrapped operation's value
    pub value: T,

    /// Attempts consumed, including the successful one
    pub attempts: u32,
}

/// Retry service owning the per-key circuit breakers.
pub struct RetryService {
    breaker_config: CircuitBreakerConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl RetryService {
    /// Create a service; breakers are created lazily per key.
    pub fn new(breaker_config: CircuitBreakerConfig) -> Self {
        Self {
            breaker_config,
            breakers: DashMap::new(),
        }
    }

    /// Get or create the breaker for a key.
    pub fn breaker(&self, key: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(key.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(key, self.breaker_config.clone()))
            })
            .clone()
    }

    /// Execute `op` with retries under the key's circuit breaker.
    ///
    /// `op` receives the 1-based attempt number. Transient and throttled
    /// failures are retried up to `policy.max_attempts`; permanent failures
    /// stop the loop immediately but still count toward the breaker tally.
    /// The breaker gates every attempt: a circuit that opens mid-call
    /// rejects the remaining attempts with [`ResilienceError::CircuitOpen`].
    /// Cancellation is honored before each attempt and during backoff.
    pub async fn execute<T, F, Fut>(
        &self,
        key: &str,
        policy: &RetryPolicy,
        cancel: &CancelToken,
        mut op: F,
    ) -> Result<RetryOutcome<T>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = std::result::Result<T, CallError>>,
    {
        let breaker = self.breaker(key);
        let max_attempts = policy.max_attempts.max(1);
        let mut attempts = 0;
        let mut last: Option<CallError> = None;

        while attempts < max_attempts {
            if cancel.is_cancelled() {
                return Err(ResilienceError::Cancelled);
            }

            if attempts > 0 {
                let delay = self.backoff_delay(policy, attempts + 1);
                debug!(key, attempt = attempts + 1, delay_ms = delay.as_millis() as u64, "Backing off before retry");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Err(ResilienceError::Cancelled),
                }
            }

            breaker.try_acquire()?;
            attempts += 1;

            match op(attempts).await {
                Ok(value) => {
                    breaker.record_success();
                    return Ok(RetryOutcome { value, attempts });
                }
                Err(error) => {
                    breaker.record_failure();
                    warn!(
                        key,
                        attempt = attempts,
                        kind = ?error.kind,
                        error = %error,
                        "Call attempt failed"
                    );
                    let retryable = error.is_retryable();
                    last = Some(error);
                    if !retryable {
                        break;
                    }
                }
            }
        }

        Err(ResilienceError::RetriesExhausted {
            attempts,
            last: last.expect("at least one attempt was made"),
        })
    }

    /// Jittered delay before the given attempt.
    ///
    /// With jitter enabled the delay is drawn from
    /// `[base/2, base]` so synchronized callers spread out.
    fn backoff_delay(&self, policy: &RetryPolicy, attempt: u32) -> Duration {
        let base = policy.delay_before(attempt);
        if !policy.jitter || base.is_zero() {
            return base;
        }
        let base_ms = base.as_millis() as u64;
        let jittered = rand::thread_rng().gen_range(base_ms / 2..=base_ms);
        Duration::from_millis(jittered)
    }
}
