//! Front gateway library.
//!
//! A reverse-proxy gateway whose routing table is built entirely from live
//! backend registrations: backends call `Handle.Update` / `Handle.Delete` on
//! the control listener, clients hit the HTTP listener, and requests are
//! routed by longest path prefix to a cluster of health-checked endpoints.

pub mod config;
pub mod control;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod routing;

pub use config::FrontConfig;
pub use error::FrontError;
pub use lifecycle::Shutdown;
pub use routing::Registry;
