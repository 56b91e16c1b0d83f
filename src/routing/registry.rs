//! The registry of clusters (the control plane's "Handle").
//!
//! # Responsibilities
//! - Map path prefixes to endpoint clusters
//! - Register / deregister backend instances
//! - Resolve inbound requests by longest prefix and hand them to a cluster
//! - Sweep every cluster for the background prober
//!
//! # Design Decisions
//! - One registry per process, passed by `Arc`, never a global
//! - The map lock is released before any cluster operation starts
//! - Invalid registrations are rejected before the map is touched

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::join_all;
use tokio::sync::Mutex;

use crate::config::FrontConfig;
use crate::error::FrontError;
use crate::load_balancer::endpoint::{build_transport, Endpoint, EndpointOptions, Transport};
use crate::load_balancer::{ClusterStatus, EndpointCluster, RoutingMode, SweepReport};
use crate::routing::matcher::longest_prefix;

/// How long an operator snapshot waits on one cluster's lock.
const STATUS_WAIT: Duration = Duration::from_millis(500);

/// Prefix → cluster map shared by the gateway, control server and prober.
#[derive(Debug)]
pub struct Registry {
    clusters: Mutex<HashMap<String, Arc<EndpointCluster>>>,
    mode: RoutingMode,
    transport: Transport,
    options: Arc<EndpointOptions>,
    requests: AtomicU64,
}

impl Registry {
    pub fn new(mode: RoutingMode, options: EndpointOptions) -> Self {
        Self {
            clusters: Mutex::new(HashMap::new()),
            mode,
            transport: build_transport(),
            options: Arc::new(options),
            requests: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &FrontConfig) -> Self {
        Self::new(
            RoutingMode::from_balance_flag(config.front.balance),
            EndpointOptions::from_config(&config.health_check, &config.timeouts),
        )
    }

    pub fn mode(&self) -> RoutingMode {
        self.mode
    }

    /// Number of requests dispatched so far.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Register `url` under `prefix`, creating the cluster if needed.
    pub async fn register(&self, prefix: &str, url: &str) -> Result<(), FrontError> {
        if prefix.is_empty() || url.is_empty() {
            return Err(FrontError::InvalidParams(format!("[{:?}, {:?}]", prefix, url)));
        }

        let endpoint = Endpoint::new(url, self.transport.clone(), self.options.clone())?;

        let cluster = {
            let mut clusters = self.clusters.lock().await;
            clusters
                .entry(prefix.to_string())
                .or_insert_with(|| {
                    tracing::info!(prefix = %prefix, "Cluster created");
                    Arc::new(EndpointCluster::new(prefix, self.mode))
                })
                .clone()
        };

        cluster.add_or_replace(endpoint).await;
        Ok(())
    }

    /// Remove `url` from `prefix`. Unknown prefixes and urls are ignored.
    pub async fn deregister(&self, prefix: &str, url: &str) {
        let Some(cluster) = self.cluster(prefix).await else {
            tracing::debug!(prefix = %prefix, url = %url, "Deregistration for unknown prefix");
            return;
        };
        if !cluster.remove(url).await {
            tracing::debug!(prefix = %prefix, url = %url, "Deregistration for unknown url");
        }
    }

    pub async fn cluster(&self, prefix: &str) -> Option<Arc<EndpointCluster>> {
        self.clusters.lock().await.get(prefix).cloned()
    }

    /// Cluster answering for `path`, by longest registered prefix.
    pub async fn resolve(&self, path: &str) -> Result<Arc<EndpointCluster>, FrontError> {
        let clusters = self.clusters.lock().await;
        if clusters.is_empty() {
            return Err(FrontError::NoServiceRegistered);
        }
        let matched = longest_prefix(clusters.keys().map(String::as_str), path)
            .and_then(|prefix| clusters.get(prefix).cloned());
        matched.ok_or(FrontError::NoRouteMatched)
    }

    /// Route one inbound request.
    pub async fn dispatch(
        &self,
        request: Request<Body>,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response<Body>, FrontError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let cluster = self.resolve(request.uri().path()).await?;
        cluster.dispatch(request, client_addr).await
    }

    /// Sweep every cluster concurrently. Pings within one cluster stay serial.
    pub async fn sweep_all(&self) -> Vec<(String, SweepReport)> {
        let clusters: Vec<Arc<EndpointCluster>> =
            self.clusters.lock().await.values().cloned().collect();

        join_all(clusters.iter().map(|cluster| async move {
            (cluster.prefix().to_string(), cluster.sweep().await)
        }))
        .await
    }

    /// Number of registered prefixes, empty clusters included.
    pub async fn cluster_count(&self) -> usize {
        self.clusters.lock().await.len()
    }

    /// Status of every cluster, ordered by prefix. A cluster whose lock is
    /// held by in-flight traffic is reported as busy.
    pub async fn snapshot(&self) -> Vec<ClusterStatus> {
        let clusters: Vec<Arc<EndpointCluster>> =
            self.clusters.lock().await.values().cloned().collect();

        let mut statuses =
            join_all(clusters.iter().map(|cluster| cluster.status_within(STATUS_WAIT))).await;
        statuses.sort_by(|a, b| a.prefix.cmp(&b.prefix));
        statuses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::new(RoutingMode::Sticky, EndpointOptions::default())
    }

    async fn resolved_prefix(registry: &Registry, path: &str) -> Result<String, FrontError> {
        registry
            .resolve(path)
            .await
            .map(|cluster| cluster.prefix().to_string())
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let registry = registry();
        assert!(matches!(
            registry.resolve("/svc").await,
            Err(FrontError::NoServiceRegistered)
        ));
    }

    #[tokio::test]
    async fn test_longest_prefix_resolution() {
        let registry = registry();
        registry.register("/a", "http://10.0.0.1:1").await.unwrap();
        registry.register("/a/b", "http://10.0.0.2:1").await.unwrap();

        assert_eq!(resolved_prefix(&registry, "/a/b/x").await.unwrap(), "/a/b");
        assert_eq!(resolved_prefix(&registry, "/a/x").await.unwrap(), "/a");
        assert!(matches!(
            registry.resolve("/other").await,
            Err(FrontError::NoRouteMatched)
        ));
    }

    #[tokio::test]
    async fn test_reregistration_is_idempotent() {
        let registry = registry();
        registry.register("/svc", "http://h1").await.unwrap();
        registry.register("/svc", "http://h1").await.unwrap();

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].endpoints, vec!["http://h1"]);
    }

    #[tokio::test]
    async fn test_invalid_registration_leaves_registry_untouched() {
        let registry = registry();

        let err = registry.register("/svc", "not a url").await.unwrap_err();
        assert!(matches!(err, FrontError::InvalidAddress { .. }));
        let err = registry.register("", "http://h1").await.unwrap_err();
        assert!(matches!(err, FrontError::InvalidParams(_)));
        let err = registry.register("/svc", "").await.unwrap_err();
        assert!(matches!(err, FrontError::InvalidParams(_)));

        assert!(registry.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_deregister() {
        let registry = registry();
        registry.register("/svc", "http://h1").await.unwrap();
        registry.register("/svc", "http://h2").await.unwrap();

        registry.deregister("/svc", "http://h2").await;
        registry.deregister("/svc", "http://never").await;
        registry.deregister("/unknown", "http://h1").await;

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot[0].endpoints, vec!["http://h1"]);
        assert_eq!(snapshot[0].current, None);
    }

    #[tokio::test]
    async fn test_empty_cluster_stays_addressable() {
        let registry = registry();
        registry.register("/svc", "http://h1").await.unwrap();
        registry.deregister("/svc", "http://h1").await;

        assert_eq!(resolved_prefix(&registry, "/svc/hello").await.unwrap(), "/svc");
        let request = Request::builder().uri("/svc/hello").body(Body::empty()).unwrap();
        assert!(matches!(
            registry.dispatch(request, None).await,
            Err(FrontError::NoServerAvailable)
        ));
        assert_eq!(registry.request_count(), 1);
    }

    #[tokio::test]
    async fn test_sweep_all_covers_every_cluster() {
        let registry = registry();
        let dead = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            format!("http://{}", listener.local_addr().unwrap())
        };
        registry.register("/a", &dead).await.unwrap();
        registry.register("/b", &dead).await.unwrap();

        let mut reports = registry.sweep_all().await;
        reports.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|(_, report)| report.evicted == 1 && report.is_empty()));

        // Empty clusters are kept.
        assert_eq!(registry.snapshot().await.len(), 2);
        assert_eq!(registry.cluster_count().await, 2);
    }
}
