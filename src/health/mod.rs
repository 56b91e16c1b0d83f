//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Prober (prober.rs):
//!     Fixed interval timer
//!     → Registry::sweep_all (clusters in parallel)
//!     → EndpointCluster::sweep (endpoints serially, under the cluster lock)
//!     → failed probe = eviction
//!
//! Dispatch-time probes happen in the cluster itself, not here.
//! ```
//!
//! # Design Decisions
//! - No hysteresis: one failed probe evicts; the backend re-registers to return
//! - No jitter or backoff on the sweep interval

pub mod prober;

pub use prober::Prober;
