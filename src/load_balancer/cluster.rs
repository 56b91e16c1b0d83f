//! Endpoint clusters.
//!
//! # Responsibilities
//! - Hold every endpoint registered under one path prefix
//! - Pick an endpoint per request according to the routing mode
//! - Evict endpoints that fail their probe, during dispatch or sweeps
//!
//! All state lives behind one async mutex. A dispatch keeps it locked until
//! the upstream response head arrives, so traffic through one cluster is
//! serialized; different clusters proceed in parallel.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::FrontError;
use crate::load_balancer::endpoint::Endpoint;
use crate::load_balancer::strategy::{RoutingMode, Strategy};
use crate::observability::metrics;

#[derive(Debug, Default)]
struct ClusterState {
    /// Keyed by each endpoint's own url.
    endpoints: BTreeMap<String, Arc<Endpoint>>,
    /// Key of the sticky target; always a key of `endpoints` when set.
    current: Option<String>,
    /// Rotation offset for balanced scans.
    cursor: usize,
}

impl ClusterState {
    fn evict(&mut self, key: &str) -> bool {
        let removed = self.endpoints.remove(key).is_some();
        if self.current.as_deref() == Some(key) {
            self.current = None;
        }
        removed
    }
}

/// Point-in-time view of a cluster, for operators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterStatus {
    pub prefix: String,
    pub endpoints: Vec<String>,
    pub current: Option<String>,
    /// The cluster lock was held by a dispatch or sweep; the endpoint list
    /// and `current` are not known.
    #[serde(default)]
    pub busy: bool,
}

/// Outcome of one health sweep over a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub evicted: usize,
    pub remaining: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }
}

/// All endpoints of one logical service.
#[derive(Debug)]
pub struct EndpointCluster {
    prefix: String,
    mode: RoutingMode,
    state: Mutex<ClusterState>,
}

impl EndpointCluster {
    pub fn new(prefix: impl Into<String>, mode: RoutingMode) -> Self {
        Self {
            prefix: prefix.into(),
            mode,
            state: Mutex::new(ClusterState::default()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Insert `endpoint`, replacing one registered at the same url, and make
    /// it the sticky target.
    pub async fn add_or_replace(&self, endpoint: Endpoint) {
        let key = endpoint.url().to_string();
        let mut state = self.state.lock().await;
        let replaced = state
            .endpoints
            .insert(key.clone(), Arc::new(endpoint))
            .is_some();
        state.current = Some(key.clone());

        tracing::info!(
            prefix = %self.prefix,
            url = %key,
            replaced,
            endpoints = state.endpoints.len(),
            "Backend server address updated"
        );
        metrics::set_cluster_size(&self.prefix, state.endpoints.len());
    }

    /// Drop `url` from the cluster. Returns whether it was registered.
    pub async fn remove(&self, url: &str) -> bool {
        let mut state = self.state.lock().await;
        let removed = state.evict(url);
        if removed {
            tracing::info!(
                prefix = %self.prefix,
                url = %url,
                endpoints = state.endpoints.len(),
                "Backend server deregistered"
            );
            metrics::set_cluster_size(&self.prefix, state.endpoints.len());
        }
        removed
    }

    /// Probe every endpoint and evict the ones that fail.
    pub async fn sweep(&self) -> SweepReport {
        let mut state = self.state.lock().await;
        let endpoints: Vec<Arc<Endpoint>> = state.endpoints.values().cloned().collect();

        let mut evicted = 0;
        for endpoint in endpoints {
            if let Err(e) = endpoint.health_check().await {
                self.log_eviction(&e, "sweep");
                state.evict(endpoint.url());
                evicted += 1;
            }
        }

        if evicted > 0 {
            metrics::set_cluster_size(&self.prefix, state.endpoints.len());
        }
        SweepReport {
            evicted,
            remaining: state.endpoints.len(),
        }
    }

    /// Route one request through a healthy endpoint.
    ///
    /// Probes candidates in the order the routing mode dictates, evicting
    /// every one that fails, and proxies through the first that answers.
    pub async fn dispatch(
        &self,
        request: Request<Body>,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response<Body>, FrontError> {
        let mut state = self.state.lock().await;
        if state.endpoints.is_empty() {
            return Err(FrontError::NoServerAvailable);
        }

        let plan = self.mode.plan(state.current.is_some());
        let cursor = state.cursor;
        if self.mode == RoutingMode::Balanced {
            state.cursor = cursor.wrapping_add(1);
        }

        for strategy in plan {
            let candidates =
                strategy.candidates(&state.endpoints, state.current.as_deref(), cursor);

            for key in candidates {
                let Some(endpoint) = state.endpoints.get(&key).cloned() else {
                    continue;
                };

                match endpoint.health_check().await {
                    Ok(()) => {
                        state.current = strategy.next_current(&key, state.current.as_deref());
                        tracing::debug!(
                            prefix = %self.prefix,
                            url = %key,
                            strategy = strategy.name(),
                            "Endpoint selected"
                        );
                        return endpoint.proxy(request, client_addr).await;
                    }
                    Err(e) => {
                        self.log_eviction(&e, strategy.name());
                        if *strategy == Strategy::Sticky {
                            tracing::warn!(prefix = %self.prefix, url = %key, "Current endpoint down, falling back");
                        }
                        state.evict(&key);
                        metrics::set_cluster_size(&self.prefix, state.endpoints.len());
                    }
                }
            }
        }

        Err(FrontError::NoServerAvailable)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.endpoints.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn current(&self) -> Option<String> {
        self.state.lock().await.current.clone()
    }

    pub async fn status(&self) -> ClusterStatus {
        let state = self.state.lock().await;
        ClusterStatus {
            prefix: self.prefix.clone(),
            endpoints: state.endpoints.keys().cloned().collect(),
            current: state.current.clone(),
            busy: false,
        }
    }

    /// Like [`EndpointCluster::status`], but gives up after `wait` and
    /// reports the cluster as busy instead of queueing behind traffic.
    pub async fn status_within(&self, wait: Duration) -> ClusterStatus {
        match tokio::time::timeout(wait, self.status()).await {
            Ok(status) => status,
            Err(_) => ClusterStatus {
                prefix: self.prefix.clone(),
                endpoints: Vec::new(),
                current: None,
                busy: true,
            },
        }
    }

    fn log_eviction(&self, error: &FrontError, during: &str) {
        tracing::warn!(
            prefix = %self.prefix,
            during,
            error = %error,
            "Endpoint failed health check, evicting"
        );
        metrics::record_eviction(&self.prefix);
    }
}
