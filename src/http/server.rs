//! HTTP gateway server.
//!
//! # Responsibilities
//! - Accept every method on every path
//! - Tag requests with an `x-request-id`
//! - Hand requests to the registry and map dispatch failures to responses
//!
//! This listener has no health or admin route of its own. Every path belongs
//! to the registered backends.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::error::FrontError;
use crate::observability::metrics;
use crate::routing::Registry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub registry: Arc<Registry>,
}

/// HTTP server for the reverse-proxy surface.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            router: Self::build_router(GatewayState { registry }),
        }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(state: GatewayState) -> Router {
        Router::new()
            .route("/", any(gateway_handler))
            .route("/{*path}", any(gateway_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Serve until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Front server started, http service listening");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP gateway stopped");
        Ok(())
    }
}

/// Catch-all handler: dispatch through the registry.
async fn gateway_handler(State(state): State<GatewayState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);

    let response = match state.registry.dispatch(request, client_addr).await {
        Ok(response) => response,
        Err(e) => {
            if matches!(e, FrontError::Upstream { .. }) {
                tracing::error!(request_id = %request_id, method = %method, path = %path, error = ?e, "Upstream error");
            } else {
                tracing::warn!(request_id = %request_id, method = %method, path = %path, error = %e, "Dispatch failed");
            }
            e.into_response()
        }
    };

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}
