//! Control plane client.
//!
//! Used by backend instances to announce themselves and by `front-ctl`.

use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::Client;
use serde_json::json;
use thiserror::Error;

use crate::control::server::{ControlStatus, RpcRequest, RpcResponse, DELETE_METHOD, UPDATE_METHOD};
use crate::load_balancer::ClusterStatus;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The control server could not be reached or answered garbage.
    #[error("control plane transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The call reached the server and was rejected.
    #[error("control plane rejected {method}: {message}")]
    Rejected { method: String, message: String },
}

/// Client for one front gateway's control listener.
#[derive(Debug)]
pub struct ControlClient {
    http: Client,
    base_url: String,
    next_id: AtomicU64,
}

impl ControlClient {
    /// `address` may be a bare `host:port` or a full `http://` URL.
    pub fn new(address: &str) -> Self {
        let base_url = if address.starts_with("http://") || address.starts_with("https://") {
            address.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", address.trim_end_matches('/'))
        };
        Self {
            http: Client::builder().no_proxy().build().unwrap_or_default(),
            base_url,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Register `url` under `prefix`.
    pub async fn update(&self, prefix: &str, url: &str) -> Result<(), ClientError> {
        self.call(UPDATE_METHOD, prefix, url).await
    }

    /// Deregister `url` from `prefix`.
    pub async fn delete(&self, prefix: &str, url: &str) -> Result<(), ClientError> {
        self.call(DELETE_METHOD, prefix, url).await
    }

    pub async fn clusters(&self) -> Result<Vec<ClusterStatus>, ClientError> {
        let clusters: Vec<ClusterStatus> = self
            .http
            .get(format!("{}/clusters", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(clusters)
    }

    pub async fn status(&self) -> Result<ControlStatus, ClientError> {
        let status: ControlStatus = self
            .http
            .get(format!("{}/status", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(status)
    }

    async fn call(&self, method: &str, prefix: &str, url: &str) -> Result<(), ClientError> {
        let request = RpcRequest {
            id: json!(self.next_id.fetch_add(1, Ordering::Relaxed)),
            method: method.to_string(),
            params: json!([prefix, url]),
        };

        let reply: RpcResponse = self
            .http
            .post(format!("{}/rpc", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match reply.error {
            None => Ok(()),
            Some(message) => Err(ClientError::Rejected {
                method: method.to_string(),
                message,
            }),
        }
    }
}
