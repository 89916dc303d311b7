//! Remote endpoint descriptors and health states
//!
//! Health is supplied by an external monitor and read-only to Convoy.

use serde::{Deserialize, Serialize};

/// A configured remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Endpoint URL
    pub url: String,

    /// Selection priority, lower is preferred
    pub priority: u32,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, priority: u32) -> Self {
        Self {
            url: url.into(),
            priority,
        }
    }
}

/// Observed health of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthState {
    /// Responding normally
    Healthy,

    /// Responding, but slowly or with intermittent errors
    Degraded,

    /// Not usable; excluded from candidate selection
    Unhealthy,

    /// No recent observation
    Unknown,
}

impl HealthState {
    /// Ordering rank for candidate selection: `Healthy < Degraded < Unknown`.
    ///
    /// `Unhealthy` endpoints are discarded before ranking; the rank exists
    /// only to keep sort keys total.
    pub fn rank(&self) -> u8 {
        match self {
            HealthState::Healthy => 0,
            HealthState::Degraded => 1,
            HealthState::Unknown => 2,
            HealthState::Unhealthy => 3,
        }
    }
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HealthState::Healthy => "healthy",
            HealthState::Degraded => "degraded",
            HealthState::Unhealthy => "unhealthy",
            HealthState::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// A health observation for one endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointHealth {
    /// Current observed state
    pub state: HealthState,

    /// When the observation was made
    pub observed_at: chrono::DateTime<chrono::Utc>,
}

impl EndpointHealth {
    pub fn new(state: HealthState) -> Self {
        Self {
            state,
            observed_at: chrono::Utc::now(),
        }
    }
}
