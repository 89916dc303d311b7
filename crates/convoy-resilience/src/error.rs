//! Resilience error types and failure classification

use thiserror::Error;

/// How a failed call should be treated by the resilience layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network/timeout-shaped; worth retrying
    Transient,

    /// Validation-shaped; retrying cannot help
    Permanent,

    /// Explicit throttling signal ("too many requests")
    Throttled,
}

/// A classified failure reported by an injected operation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CallError {
    /// Classification, owned by the collaborator that ran the transport
    pub kind: FailureKind,

    /// Human-readable detail
    pub message: String,
}

impl CallError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Permanent,
            message: message.into(),
        }
    }

    pub fn throttled(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Throttled,
            message: message.into(),
        }
    }

    /// Whether the retry loop may attempt this call again.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, FailureKind::Transient | FailureKind::Throttled)
    }
}

/// Resilience layer errors
#[derive(Debug, Error)]
pub enum ResilienceError {
    #[error("Circuit open for {key}")]
    CircuitOpen {
        /// Failure-tracking key (endpoint + operation)
        key: String,
    },

    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Attempts actually made
        attempts: u32,
        /// The final classified failure
        last: CallError,
    },

    #[error("Rate limited after {retries} backoff retries: {last}")]
    RateLimited {
        /// Backoff retries consumed
        retries: u32,
        /// The original throttling failure
        last: CallError,
    },

    #[error("All endpoints failed ({attempted} attempted), last error: {last}")]
    AllEndpointsFailed {
        /// Candidates attempted
        attempted: usize,
        /// Last per-endpoint error
        last: String,
    },

    #[error("No endpoint available: every configured endpoint is unhealthy")]
    NoEndpointAvailable,

    #[error("Operation cancelled")]
    Cancelled,

    /// A non-throttled failure passed through untouched by the rate limiter.
    #[error(transparent)]
    Call(#[from] CallError),
}

/// Result type for resilience operations
pub type Result<T> = std::result::Result<T, ResilienceError>;
