//! Throttle-aware rate limiter
//!
//! Distinguished from the retry service by its trigger: only explicit
//! throttling signals ("too many requests") cause backoff here. Any other
//! failure passes through untouched. Status transitions between `Healthy`
//! and `RateLimited` are emitted for observability whenever the limiter
//! enters or exits a backing-off state.

use crate::config::RateLimitPolicy;
use crate::error::{FailureKind, ResilienceError, Result};
use convoy_types::CancelToken;
use std::future::Future;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Limiter status, visible to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterStatus {
    /// Calls are going through
    Healthy,

    /// Backing off on throttling responses
    RateLimited,
}

impl std::fmt::Display for LimiterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LimiterStatus::Healthy => "healthy",
            LimiterStatus::RateLimited => "rate-limited",
        };
        write!(f, "{s}")
    }
}

/// Events emitted by the rate limiter.
#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    /// The limiter's status changed.
    StatusChanged {
        old_status: LimiterStatus,
        new_status: LimiterStatus,
    },
}

/// Rate limiter wrapping a single outbound call.
pub struct RateLimiter {
    policy: RateLimitPolicy,
    status: Mutex<LimiterStatus>,
    event_tx: broadcast::Sender<RateLimiterEvent>,
}

impl RateLimiter {
    /// Create a healthy limiter.
    pub fn new(policy: RateLimitPolicy) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            policy,
            status: Mutex::new(LimiterStatus::Healthy),
            event_tx,
        }
    }

    /// Subscribe to status-change events.
    pub fn subscribe(&self) -> broadcast::Receiver<RateLimiterEvent> {
        self.event_tx.subscribe()
    }

    /// Current status.
    pub fn status(&self) -> LimiterStatus {
        *self.status.lock().expect("limiter lock poisoned")
    }

    /// Run `op`, backing off and retrying on throttling responses.
    ///
    /// Backoff doubles from `initial_backoff` toward `max_backoff` per
    /// retry; after `max_retries` the original throttling error is
    /// surfaced. Non-throttled failures return unchanged on the first
    /// occurrence.
    pub async fn call<T, F, Fut>(&self, cancel: &CancelToken, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, crate::error::CallError>>,
    {
        let mut backoff = self.policy.initial_backoff;
        let mut retries = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(ResilienceError::Cancelled);
            }

            match op().await {
                Ok(value) => {
                    self.set_status(LimiterStatus::Healthy);
                    return Ok(value);
                }
                Err(error) if error.kind == FailureKind::Throttled => {
                    if retries >= self.policy.max_retries {
                        warn!(retries, "Throttling persists, surfacing error");
                        return Err(ResilienceError::RateLimited {
                            retries,
                            last: error,
                        });
                    }
                    retries += 1;
                    self.set_status(LimiterStatus::RateLimited);
                    warn!(
                        retry = retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "Throttled, backing off"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = cancel.cancelled() => return Err(ResilienceError::Cancelled),
                    }
                    backoff = (backoff * 2).min(self.policy.max_backoff);
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Update status, emitting an event only on change.
    fn set_status(&self, new_status: LimiterStatus) {
        let mut status = self.status.lock().expect("limiter lock poisoned");
        if *status == new_status {
            return;
        }
        let old_status = *status;
        *status = new_status;
        info!(from = %old_status, to = %new_status, "Rate limiter status changed");
        let _ = self.event_tx.send(RateLimiterEvent::StatusChanged {
            old_status,
            new_status,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn quick_policy(max_retries: u32) -> RateLimitPolicy {
        RateLimitPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(40),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_throttling_clears() {
        let limiter = RateLimiter::new(quick_policy(5));
        let mut events = limiter.subscribe();
        let calls = AtomicU32::new(0);

        let value = limiter
            .call(&CancelToken::new(), || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(CallError::throttled("429 too many requests"))
                    } else {
                        Ok(99)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 99);
        assert_eq!(limiter.status(), LimiterStatus::Healthy);

        // Entered backing-off once, exited once.
        let RateLimiterEvent::StatusChanged { new_status, .. } = events.try_recv().unwrap();
        assert_eq!(new_status, LimiterStatus::RateLimited);
        let RateLimiterEvent::StatusChanged { new_status, .. } = events.try_recv().unwrap();
        assert_eq!(new_status, LimiterStatus::Healthy);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn surfaces_original_error_after_max_retries() {
        let limiter = RateLimiter::new(quick_policy(2));
        let calls = AtomicU32::new(0);

        let err = limiter
            .call(&CancelToken::new(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(CallError::throttled("429")) }
            })
            .await
            .unwrap_err();

        // Initial call plus two backoff retries.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match err {
            ResilienceError::RateLimited { retries, last } => {
                assert_eq!(retries, 2);
                assert_eq!(last.message, "429");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn non_throttled_errors_pass_through() {
        let limiter = RateLimiter::new(quick_policy(5));
        let calls = AtomicU32::new(0);

        let err = limiter
            .call(&CancelToken::new(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(CallError::transient("connection reset")) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, ResilienceError::Call(_)));
        assert_eq!(limiter.status(), LimiterStatus::Healthy);
    }
}
