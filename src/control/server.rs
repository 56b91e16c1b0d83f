//! RPC control server.
//!
//! # Routes
//! - `POST /rpc`: `{"id", "method", "params": [prefix, url]}` → `{"id", "error"}`
//! - `GET /clusters`: registry snapshot
//! - `GET /status`: version, routing mode and request counter

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::error::FrontError;
use crate::load_balancer::{ClusterStatus, RoutingMode};
use crate::observability::metrics;
use crate::routing::Registry;

pub const UPDATE_METHOD: &str = "Handle.Update";
pub const DELETE_METHOD: &str = "Handle.Delete";

/// One remote call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    /// Kept loose so a wrong shape becomes an `InvalidParams` reply.
    #[serde(default)]
    pub params: Value,
}

/// Reply to one remote call; `error` is `None` on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: Value,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlStatus {
    pub version: String,
    pub mode: String,
    pub requests: u64,
    pub clusters: usize,
}

/// Extract the `[prefix, url]` pair.
fn registration_params(params: &Value) -> Result<(&str, &str), FrontError> {
    match params.as_array().map(Vec::as_slice) {
        Some([Value::String(prefix), Value::String(url)])
            if !prefix.is_empty() && !url.is_empty() =>
        {
            Ok((prefix.as_str(), url.as_str()))
        }
        _ => Err(FrontError::InvalidParams(params.to_string())),
    }
}

/// Execute one call against the registry.
pub async fn call(registry: &Registry, request: RpcRequest) -> RpcResponse {
    let outcome = match request.method.as_str() {
        UPDATE_METHOD => match registration_params(&request.params) {
            Ok((prefix, url)) => registry
                .register(prefix, url)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        },
        DELETE_METHOD => match registration_params(&request.params) {
            Ok((prefix, url)) => {
                tracing::info!(prefix = %prefix, url = %url, "Backend server unsigned");
                registry.deregister(prefix, url).await;
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        },
        other => Err(format!("rpc: can't find method {}", other)),
    };

    metrics::record_registration(&request.method, outcome.is_ok());
    if let Err(ref e) = outcome {
        tracing::warn!(method = %request.method, params = %request.params, error = %e, "Control call rejected");
    }

    RpcResponse {
        id: request.id,
        error: outcome.err(),
    }
}

async fn rpc_handler(
    State(registry): State<Arc<Registry>>,
    Json(request): Json<RpcRequest>,
) -> Json<RpcResponse> {
    Json(call(&registry, request).await)
}

async fn clusters_handler(State(registry): State<Arc<Registry>>) -> Json<Vec<ClusterStatus>> {
    Json(registry.snapshot().await)
}

async fn status_handler(State(registry): State<Arc<Registry>>) -> Json<ControlStatus> {
    let mode = match registry.mode() {
        RoutingMode::Sticky => "sticky",
        RoutingMode::Balanced => "balanced",
    };
    Json(ControlStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        mode: mode.to_string(),
        requests: registry.request_count(),
        clusters: registry.cluster_count().await,
    })
}

/// Listener for backend registrations.
pub struct ControlServer {
    router: Router,
}

impl ControlServer {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            router: Self::build_router(registry),
        }
    }

    pub fn build_router(registry: Arc<Registry>) -> Router {
        Router::new()
            .route("/rpc", post(rpc_handler))
            .route("/clusters", get(clusters_handler))
            .route("/status", get(status_handler))
            .with_state(registry)
            .layer(TraceLayer::new_for_http())
    }

    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Front server started, reg service listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Control server stopped");
        Ok(())
    }
}
