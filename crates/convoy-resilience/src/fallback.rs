//! Endpoint fallback routing
//!
//! Ranks configured endpoints by observed health and priority, then tries
//! them in order through the retry service until one succeeds. A bad
//! endpoint's open circuit moves the router on to the next candidate
//! instead of failing the call.

use crate::config::RetryPolicy;
use crate::error::{CallError, ResilienceError, Result};
use crate::retry::RetryService;
use async_trait::async_trait;
use convoy_types::{CancelToken, Endpoint, HealthState};
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Read-only endpoint health lookup.
///
/// Supplied and refreshed by an external health monitor; the router only
/// reads it.
#[async_trait]
pub trait EndpointHealthSource: Send + Sync {
    /// Current observed health for an endpoint URL.
    async fn health(&self, url: &str) -> HealthState;
}

/// In-memory health source for hosts and tests.
pub struct InMemoryEndpointHealthSource {
    states: DashMap<String, HealthState>,
}

impl InMemoryEndpointHealthSource {
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
        }
    }

    /// Record an observation.
    pub fn set(&self, url: impl Into<String>, state: HealthState) {
        self.states.insert(url.into(), state);
    }
}

impl Default for InMemoryEndpointHealthSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EndpointHealthSource for InMemoryEndpointHealthSource {
    async fn health(&self, url: &str) -> HealthState {
        self.states
            .get(url)
            .map(|s| *s)
            .unwrap_or(HealthState::Unknown)
    }
}

/// Successful result of a routed call.
#[derive(Debug, Clone)]
pub struct FallbackOutcome<T> {
    /// The wrapped operation's value
    pub value: T,

    /// URL of the endpoint that served the call
    pub endpoint: String,

    /// Attempts consumed against that endpoint
    pub attempts: u32,
}

/// Routes calls to the healthiest available endpoint.
pub struct FallbackRouter {
    endpoints: Vec<Endpoint>,
    health: Arc<dyn EndpointHealthSource>,
    retry: Arc<RetryService>,
    policy: RetryPolicy,
}

impl FallbackRouter {
    pub fn new(
        endpoints: Vec<Endpoint>,
        health: Arc<dyn EndpointHealthSource>,
        retry: Arc<RetryService>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            endpoints,
            health,
            retry,
            policy,
        }
    }

    /// Candidates in attempt order: unhealthy endpoints discarded, the rest
    /// sorted by `(health rank, priority)` ascending. The sort is stable,
    /// so equal keys keep configuration order.
    async fn candidates(&self) -> Vec<(Endpoint, HealthState)> {
        let mut ranked = Vec::with_capacity(self.endpoints.len());
        for endpoint in &self.endpoints {
            let state = self.health.health(&endpoint.url).await;
            if state == HealthState::Unhealthy {
                debug!(url = %endpoint.url, "Discarding unhealthy endpoint");
                continue;
            }
            ranked.push((endpoint.clone(), state));
        }
        ranked.sort_by_key(|(endpoint, state)| (state.rank(), endpoint.priority));
        ranked
    }

    /// Issue `op` against candidates in health/priority order.
    ///
    /// Each candidate attempt goes through the retry service keyed by that
    /// endpoint's URL; the first success wins. Per-endpoint failures and
    /// open circuits log and move on; cancellation aborts the whole call.
    pub async fn call<T, F, Fut>(
        &self,
        cancel: &CancelToken,
        op: F,
    ) -> Result<FallbackOutcome<T>>
    where
        F: Fn(Endpoint) -> Fut,
        Fut: Future<Output = std::result::Result<T, CallError>>,
    {
        let candidates = self.candidates().await;
        if candidates.is_empty() {
            warn!("No endpoint available for routing");
            return Err(ResilienceError::NoEndpointAvailable);
        }

        let attempted = candidates.len();
        let mut last_error = String::new();

        for (endpoint, state) in candidates {
            debug!(url = %endpoint.url, health = %state, "Trying endpoint");
            let result = self
                .retry
                .execute(&endpoint.url, &self.policy, cancel, |_| {
                    op(endpoint.clone())
                })
                .await;

            match result {
                Ok(outcome) => {
                    info!(
                        url = %endpoint.url,
                        attempts = outcome.attempts,
                        "Endpoint call succeeded"
                    );
                    return Ok(FallbackOutcome {
                        value: outcome.value,
                        endpoint: endpoint.url,
                        attempts: outcome.attempts,
                    });
                }
                Err(ResilienceError::Cancelled) => return Err(ResilienceError::Cancelled),
                Err(error) => {
                    warn!(url = %endpoint.url, error = %error, "Endpoint failed, falling back");
                    last_error = error.to_string();
                }
            }
        }

        Err(ResilienceError::AllEndpointsFailed {
            attempted,
            last: last_error,
        })
    }
}
