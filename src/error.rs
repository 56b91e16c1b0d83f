//! Error taxonomy for the front gateway.
//!
//! # Propagation
//! ```text
//! Unreachable            → handled inside the cluster (evict, keep scanning)
//!                          → exhausted scan becomes NoServerAvailable
//! InvalidAddress/Params  → returned to the RPC caller, registry untouched
//! NoRoute/NoService/...  → HTTP 500 for that one request, logged
//! Upstream               → HTTP 502 for that one request, logged
//! ```
//!
//! The `Display` text of the dispatch errors is the exact plain-text body the
//! gateway writes back to the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors raised by the registry, its clusters and endpoints.
#[derive(Debug, Error)]
pub enum FrontError {
    /// A registered address is not an absolute `http` URL.
    #[error("invalid backend address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// An RPC call did not carry a `[prefix, url]` pair of non-empty strings.
    #[error("Invalid parameters! expected [prefix, url], got {0}")]
    InvalidParams(String),

    /// The endpoint did not answer its health probe.
    #[error("endpoint {url} unreachable: {reason}")]
    Unreachable { url: String, reason: String },

    /// The selected cluster has no healthy endpoint left.
    #[error("No server available.")]
    NoServerAvailable,

    /// No registered prefix matches the request path.
    #[error("No handler matched.")]
    NoRouteMatched,

    /// Nothing has registered with the gateway yet.
    #[error("No server registered.")]
    NoServiceRegistered,

    /// The proxied request failed after the endpoint passed its probe.
    #[error("Upstream request failed.")]
    Upstream { url: String, reason: String },
}

impl FrontError {
    pub(crate) fn invalid_address(address: &str, reason: impl ToString) -> Self {
        FrontError::InvalidAddress {
            address: address.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unreachable(url: &str, reason: impl ToString) -> Self {
        FrontError::Unreachable {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Status code the gateway answers with when a dispatch ends in this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            FrontError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for FrontError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            // Only the dispatch errors have client-facing text; the rest are
            // never expected here and collapse to a generic message.
            FrontError::NoServerAvailable
            | FrontError::NoRouteMatched
            | FrontError::NoServiceRegistered
            | FrontError::Upstream { .. } => self.to_string(),
            _ => "Internal gateway error.".to_string(),
        };
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_bodies() {
        assert_eq!(FrontError::NoServerAvailable.to_string(), "No server available.");
        assert_eq!(FrontError::NoRouteMatched.to_string(), "No handler matched.");
        assert_eq!(FrontError::NoServiceRegistered.to_string(), "No server registered.");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            FrontError::NoRouteMatched.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let upstream = FrontError::Upstream {
            url: "http://127.0.0.1:1".into(),
            reason: "connection refused".into(),
        };
        assert_eq!(upstream.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(upstream.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
