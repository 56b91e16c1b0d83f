//! HTTP gateway subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum catch-all, request id, trace span)
//!     → Registry::dispatch (prefix → cluster → endpoint)
//!     → upstream response streamed back, or 500/502 with a plain-text reason
//! ```

pub mod server;

pub use server::GatewayServer;
