//! Endpoint abstraction.
//!
//! # Responsibilities
//! - Represent one registered backend instance by its base URL
//! - Forward a single request to it (reverse-proxy semantics)
//! - Probe its health endpoint
//!
//! An `Endpoint` is immutable once constructed; clusters share it via `Arc`
//! without further locking.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::uri::{Authority, Scheme};
use axum::http::{Method, Request, Response, Uri, Version};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::config::{HealthCheckConfig, TimeoutConfig};
use crate::error::FrontError;

/// HTTP client shared by every endpoint of a registry.
pub type Transport = Client<HttpConnector, Body>;

/// Build the pooled client used for proxying and probing.
pub fn build_transport() -> Transport {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Headers that only apply to a single hop and must not be forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Probe and forwarding knobs shared by all endpoints of a registry.
#[derive(Debug, Clone)]
pub struct EndpointOptions {
    /// Path appended to the endpoint base path for health probes.
    pub probe_path: String,
    /// Upper bound for one probe (`None` waits forever).
    pub probe_timeout: Option<Duration>,
    /// Upper bound for receiving the upstream response head.
    pub upstream_timeout: Option<Duration>,
}

impl EndpointOptions {
    pub fn from_config(health: &HealthCheckConfig, timeouts: &TimeoutConfig) -> Self {
        Self {
            probe_path: health.path.clone(),
            probe_timeout: secs_to_timeout(health.timeout_secs),
            upstream_timeout: secs_to_timeout(timeouts.upstream_secs),
        }
    }
}

impl Default for EndpointOptions {
    fn default() -> Self {
        Self::from_config(&HealthCheckConfig::default(), &TimeoutConfig::default())
    }
}

fn secs_to_timeout(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// A single registered backend instance.
#[derive(Debug)]
pub struct Endpoint {
    /// The address exactly as registered; also the cluster map key.
    url: String,
    base_path: String,
    base_query: Option<String>,
    authority: Authority,
    probe_uri: Uri,
    transport: Transport,
    options: Arc<EndpointOptions>,
}

impl Endpoint {
    /// Parse `url` and bind a reverse-proxy transport to it.
    ///
    /// Fails with `InvalidAddress` unless `url` is an absolute `http` URL with
    /// a host, so a bad registration never reaches request time.
    pub fn new(
        url: &str,
        transport: Transport,
        options: Arc<EndpointOptions>,
    ) -> Result<Self, FrontError> {
        let parsed = Url::parse(url).map_err(|e| FrontError::invalid_address(url, e))?;

        if parsed.scheme() != "http" {
            return Err(FrontError::invalid_address(
                url,
                format!("unsupported scheme {:?}", parsed.scheme()),
            ));
        }

        let host = match parsed.host_str() {
            Some(host) if !host.is_empty() => host,
            _ => return Err(FrontError::invalid_address(url, "missing host")),
        };
        let authority = match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority =
            Authority::from_str(&authority).map_err(|e| FrontError::invalid_address(url, e))?;

        let base_path = parsed.path().to_string();
        let probe_uri = Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(authority.clone())
            .path_and_query(join_paths(&base_path, &options.probe_path))
            .build()
            .map_err(|e| FrontError::invalid_address(url, e))?;

        Ok(Self {
            url: url.to_string(),
            base_path,
            base_query: parsed.query().filter(|q| !q.is_empty()).map(str::to_string),
            authority,
            probe_uri,
            transport,
            options,
        })
    }

    /// The address this endpoint was registered under.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue `GET <url>/ping` and drain the body.
    ///
    /// Any response counts as healthy; the status code is not inspected.
    pub async fn health_check(&self) -> Result<(), FrontError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(self.probe_uri.clone())
            .header(header::USER_AGENT, "front-gateway-health-check")
            .body(Body::empty())
            .map_err(|e| FrontError::unreachable(&self.url, e))?;

        let probe = async {
            let response = self
                .transport
                .request(request)
                .await
                .map_err(|e| FrontError::unreachable(&self.url, e))?;
            axum::body::to_bytes(Body::new(response.into_body()), usize::MAX)
                .await
                .map_err(|e| FrontError::unreachable(&self.url, e))?;
            Ok::<(), FrontError>(())
        };

        match self.options.probe_timeout {
            Some(limit) => tokio::time::timeout(limit, probe)
                .await
                .map_err(|_| FrontError::unreachable(&self.url, "probe timed out"))?,
            None => probe.await,
        }
    }

    /// Forward `request` to this endpoint and hand back the upstream response.
    ///
    /// The response body is streamed, not buffered. No retry happens here.
    pub async fn proxy(
        &self,
        request: Request<Body>,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response<Body>, FrontError> {
        let (mut parts, body) = request.into_parts();

        parts.uri = self.target_uri(&parts.uri)?;
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);
        parts.headers.remove(header::HOST);
        if let Some(addr) = client_addr {
            append_forwarded_for(&mut parts.headers, addr.ip());
        }

        let pending = self.transport.request(Request::from_parts(parts, body));
        let result = match self.options.upstream_timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| self.upstream_error("timed out waiting for response"))?,
            None => pending.await,
        };
        let response = result.map_err(|e| self.upstream_error(e))?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }

    /// Rewrite an inbound URI so it points at this endpoint.
    fn target_uri(&self, incoming: &Uri) -> Result<Uri, FrontError> {
        let mut path_and_query = join_paths(&self.base_path, incoming.path());
        let query: Vec<&str> = [self.base_query.as_deref(), incoming.query()]
            .into_iter()
            .flatten()
            .filter(|q| !q.is_empty())
            .collect();
        if !query.is_empty() {
            path_and_query.push('?');
            path_and_query.push_str(&query.join("&"));
        }

        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| self.upstream_error(e))
    }

    fn upstream_error(&self, reason: impl ToString) -> FrontError {
        FrontError::Upstream {
            url: self.url.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Join two paths with exactly one slash between them.
pub(crate) fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named by Connection are hop-by-hop too.
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_str(name.trim()).ok())
        .collect();
    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, ip: IpAddr) {
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) if !prior.is_empty() => format!("{}, {}", prior, ip),
        _ => ip.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
