//! Convoy Resolver - Dependency resolution for deployment batches
//!
//! Turns declared package dependencies into a directed graph, detects
//! cycles, and computes a topological execution order with parallel-safe
//! waves. Pure computation: no I/O, no concurrency.
//!
//! ## Semantics
//!
//! - An edge exists only when a declared dependency name matches another
//!   scanned package's id or name. External library dependencies never
//!   match and are not edges (best-effort local resolution; no semver).
//! - Resolution **fails closed** on cycles: all discovered cycles are
//!   reported and no partial order is ever returned.
//! - Within a wave, nodes keep original scan order for determinism.
//!
//! ## Example
//!
//! ```rust
//! use convoy_resolver::resolve;
//! use convoy_types::ManifestNode;
//!
//! let manifests = vec![
//!     ManifestNode::new("a", "a").with_dependency("b"),
//!     ManifestNode::new("b", "b"),
//! ];
//!
//! let resolution = resolve(&manifests).unwrap();
//! assert!(resolution.is_resolvable());
//! assert_eq!(resolution.order.len(), 2);
//! ```

#![deny(unsafe_code)]

pub mod cycle;
pub mod error;
pub mod graph;
pub mod source;
pub mod waves;

pub use cycle::find_cycles;
pub use error::{ResolveError, Result};
pub use graph::DependencyGraph;
pub use source::{ManifestSource, StaticManifestSource};
pub use waves::{resolve, resolve_graph, ResolutionResult};
