//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Registry → bind both listeners → spawn servers + prober
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → servers drain, prober exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: a listener that cannot bind is fatal
//! - Both listeners bind before any task starts serving
//! - Draining is bounded by `timeouts.shutdown_secs`; leftovers are aborted

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{launch, Launched, StartupError};
