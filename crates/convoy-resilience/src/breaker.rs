//! Per-key circuit breaker
//!
//! State machine: `Closed -> Open` after a threshold of consecutive
//! failures; `Open` rejects without invoking the wrapped call until
//! `reset_timeout` elapses, then exactly one probe is admitted in
//! `HalfOpen`; probe success closes the circuit, probe failure reopens it
//! and restarts the timeout.
//!
//! Concurrent calls on the same key serialize their transitions through the
//! breaker's lock; different keys are independent.

use crate::config::CircuitBreakerConfig;
use crate::error::ResilienceError;
use std::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Circuit state for one failure-tracking key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through
    Closed,

    /// Calls fail immediately
    Open,

    /// One probe call in flight
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Circuit breaker for a single failure-tracking key.
#[derive(Debug)]
pub struct CircuitBreaker {
    key: String,
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a closed breaker for a key.
    pub fn new(key: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            key: key.into(),
            config,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    /// The key this breaker tracks.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current circuit state.
    pub fn state(&self) -> CircuitState {
        self.state.lock().expect("breaker lock poisoned").state
    }

    /// Gate a call attempt.
    ///
    /// `Ok(())` admits the call. An open circuit whose reset timeout has
    /// elapsed transitions to half-open and admits the caller as the probe;
    /// anyone else arriving while the probe is outstanding is rejected.
    pub fn try_acquire(&self) -> Result<(), ResilienceError> {
        let mut state = self.state.lock().expect("breaker lock poisoned");
        match state.state {
            CircuitState::Closed => Ok(()),
            CircuitState::HalfOpen => Err(ResilienceError::CircuitOpen {
                key: self.key.clone(),
            }),
            CircuitState::Open => {
                let elapsed = state
                    .opened_at
                    .map(|at| at.elapsed() >= self.config.reset_timeout)
                    .unwrap_or(true);
                if elapsed {
                    info!(key = %self.key, "Circuit half-open, admitting probe");
                    state.state = CircuitState::HalfOpen;
                    Ok(())
                } else {
                    Err(ResilienceError::CircuitOpen {
                        key: self.key.clone(),
                    })
                }
            }
        }
    }

    /// Record a successful call: close the circuit and reset the tally.
    pub fn record_success(&self) {
        let mut state = self.state.lock().expect("breaker lock poisoned");
        if state.state != CircuitState::Closed {
            info!(key = %self.key, from = %state.state, "Circuit closed");
        }
        state.state = CircuitState::Closed;
        state.consecutive_failures = 0;
        state.opened_at = None;
    }

    /// Record a failed call.
    ///
    /// A half-open probe failure reopens immediately; in closed state the
    /// tally grows and the circuit opens at the threshold.
    pub fn record_failure(&self) {
        let mut state = self.state.lock().expect("breaker lock poisoned");
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);

        match state.state {
            CircuitState::HalfOpen => {
                warn!(key = %self.key, "Probe failed, circuit reopened");
                state.state = CircuitState::Open;
                state.opened_at = Some(Instant::now());
            }
            CircuitState::Closed if state.consecutive_failures >= self.config.failure_threshold => {
                warn!(
                    key = %self.key,
                    failures = state.consecutive_failures,
                    "Failure threshold reached, circuit opened"
                );
                state.state = CircuitState::Open;
                state.opened_at = Some(Instant::now());
            }
            _ => {
                debug!(
                    key = %self.key,
                    failures = state.consecutive_failures,
                    "Failure recorded"
                );
            }
        }
    }

    /// Reset to closed with a clean tally.
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("breaker lock poisoned");
        state.state = CircuitState::Closed;
        state.consecutive_failures = 0;
        state.opened_at = None;
    }
}
