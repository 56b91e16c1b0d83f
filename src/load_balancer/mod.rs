//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Registry picked a cluster by prefix
//!     → cluster.rs (lock cluster state)
//!     → strategy.rs (ordered candidates for the routing mode)
//!     → endpoint.rs (probe candidate; evict on failure)
//!     → endpoint.rs (proxy through the first healthy one)
//!     → Return upstream response or NoServerAvailable
//! ```
//!
//! # Design Decisions
//! - Strategies are pure; probing and eviction live in the cluster
//! - The sticky target is stored as a key, never as a second handle
//! - Endpoints are immutable and shared via `Arc`

pub mod cluster;
pub mod endpoint;
pub mod strategy;

pub use cluster::{ClusterStatus, EndpointCluster, SweepReport};
pub use endpoint::{Endpoint, EndpointOptions, Transport};
pub use strategy::{RoutingMode, Strategy};
