//! Control plane subsystem.
//!
//! # Data Flow
//! ```text
//! Backend instance / front-ctl
//!     → client.rs (JSON envelope over HTTP)
//!     → server.rs (POST /rpc: Handle.Update / Handle.Delete)
//!     → Registry::register / Registry::deregister
//! ```
//!
//! # Design Decisions
//! - Every call takes an ordered `[prefix, url]` pair
//! - Errors travel in the reply envelope, never as transport failures
//! - No authentication: the listener is expected on a private address

pub mod client;
pub mod server;

pub use client::{ClientError, ControlClient};
pub use server::{ControlServer, ControlStatus, RpcRequest, RpcResponse, DELETE_METHOD, UPDATE_METHOD};
