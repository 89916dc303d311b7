//! Convoy Types - Core types for batch deployment orchestration
//!
//! Convoy deploys sets of interdependent packages ("contracts") to a remote
//! network. This crate holds the data model shared by the resolver, the
//! batch executor, and the resilience layer.
//!
//! ## Architectural Boundaries
//!
//! - **convoy-resolver** owns: dependency graphs, cycle detection, waves
//! - **convoy-executor** owns: batch scheduling, progress, run reports
//! - **convoy-resilience** owns: retry, circuit breaking, endpoint fallback
//! - This crate owns: the vocabulary they exchange
//!
//! ## Key Concepts
//!
//! - **ManifestNode**: one deployable package discovered by a manifest scan
//! - **BatchItem**: one unit of deployment work with resolved dependencies
//! - **ItemStatus**: per-item lifecycle (pending through terminal states)
//! - **BatchRunReport**: immutable record of a completed run
//! - **Endpoint / HealthState**: remote endpoints and their observed health
//! - **CancelToken**: cooperative cancellation threaded through every layer

#![deny(unsafe_code)]

pub mod cancel;
pub mod endpoint;
pub mod ids;
pub mod item;
pub mod manifest;
pub mod report;

// Re-export main types
pub use cancel::CancelToken;
pub use endpoint::{Endpoint, EndpointHealth, HealthState};
pub use ids::{ItemId, NodeId, RunId};
pub use item::{BatchItem, ItemStatus, SourceDescriptor};
pub use manifest::ManifestNode;
pub use report::{BatchRunReport, ItemResult, StatusCounts};
