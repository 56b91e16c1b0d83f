//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Backend registration (control plane)
//!     → registry.rs (validate url, create cluster lazily, add endpoint)
//!
//! Incoming request (path)
//!     → registry.rs (lock map, snapshot matching cluster, unlock)
//!     → matcher.rs (longest registered prefix of the path)
//!     → cluster dispatch (load_balancer)
//! ```
//!
//! # Design Decisions
//! - Routes are built at runtime from live registrations only
//! - The registry lock covers map lookups/inserts, never a cluster operation
//! - Empty clusters stay addressable and answer "No server available."

pub mod matcher;
pub mod registry;

pub use registry::Registry;
