//! Convoy Resilience - Retry, circuit breaking and endpoint fallback
//!
//! Wraps the network-touching half of a deployment run. Every remote call a
//! deployer issues can be routed through this crate for bounded retries,
//! per-endpoint failure isolation, throttle-aware pacing, and fallback
//! across configured endpoints.
//!
//! ## Key Components
//!
//! - [`RetryService`]: bounded retries with exponential backoff, gated by a
//!   per-key [`CircuitBreaker`]
//! - [`RateLimiter`]: backoff specifically for throttling responses, with
//!   `Healthy <-> RateLimited` status events
//! - [`FallbackRouter`]: tries configured endpoints in health/priority
//!   order until one succeeds
//! - [`EndpointHealthSource`]: read-only health lookup supplied by an
//!   external monitor
//!
//! ## Error Classification
//!
//! The injected operation reports failures as [`CallError`] with a
//! [`FailureKind`]: transient failures are retried, permanent failures fail
//! immediately (but still count toward the breaker), throttled failures are
//! the rate limiter's trigger. Classification belongs to the collaborator
//! that owns the transport; this crate only consumes the kind.
//!
//! ## Concurrency
//!
//! Per-key breaker state is serialized by a per-breaker lock; different
//! keys live in independent [`dashmap`] shards and never block each other.
//! Cancellation is honored before every attempt and during every backoff
//! sleep.

#![deny(unsafe_code)]

pub mod breaker;
pub mod config;
pub mod error;
pub mod fallback;
pub mod rate_limit;
pub mod retry;

// Re-export main types
pub use breaker::{CircuitBreaker, CircuitState};
pub use config::{CircuitBreakerConfig, RateLimitPolicy, RetryPolicy};
pub use error::{CallError, FailureKind, ResilienceError, Result};
pub use fallback::{
    EndpointHealthSource, FallbackOutcome, FallbackRouter, InMemoryEndpointHealthSource,
};
pub use rate_limit::{LimiterStatus, RateLimiter, RateLimiterEvent};
pub use retry::{RetryOutcome, RetryService};
