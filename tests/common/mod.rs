//! Shared utilities for the gateway integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use front_gateway::config::FrontConfig;
use front_gateway::control::ControlClient;
use front_gateway::lifecycle::{launch, Launched, Shutdown};

/// A running mock backend. Dropping the handle does not stop it; call `kill`.
pub struct MockBackend {
    pub addr: SocketAddr,
    task: JoinHandle<()>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop accepting connections; later probes see connection refused.
    pub async fn kill(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}

/// Backend answering every request (probes included) with `200 body`.
pub async fn start_mock_backend(body: &'static str) -> MockBackend {
    start_programmable_backend(move || async move { (200, body.to_string()) }).await
}

/// Backend whose status and body come from `f`, called once per connection.
pub async fn start_programmable_backend<F, Fut>(f: F) -> MockBackend
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    let task = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        // Read the request head; mock bodies are never inspected.
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockBackend { addr, task }
}

/// Axum backend that answers `/ping` and echoes the path, query and
/// `X-Forwarded-For` of everything else as `path?query|xff`.
pub async fn start_echo_backend() -> MockBackend {
    use axum::{extract::Request, routing::get, Router};

    let app = Router::new()
        .route("/ping", get(|| async { "pong" }))
        .fallback(|request: Request| async move {
            let xff = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            let target = request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_default();
            format!("{}|{}", target, xff)
        });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockBackend { addr, task }
}

/// Backend that answers `/ping` but never answers anything else. The
/// connection stays open until the backend is killed.
pub async fn start_hanging_backend() -> MockBackend {
    start_stalling_backend(true).await
}

/// Backend that accepts connections and never writes a byte, probes
/// included.
pub async fn start_silent_backend() -> MockBackend {
    start_stalling_backend(false).await
}

async fn start_stalling_backend(answer_ping: bool) -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let task = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap_or(0);
            if answer_ping && buf[..n].starts_with(b"GET /ping") {
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: close\r\n\r\npong")
                    .await;
                let _ = socket.shutdown().await;
            } else {
                held.push(socket);
            }
        }
    });

    MockBackend { addr, task }
}

/// A URL with nothing listening behind it.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    format!("http://{}", listener.local_addr().unwrap())
}

/// Gateway config with both listeners on ephemeral ports.
pub fn test_config(balance: bool) -> FrontConfig {
    let mut config = FrontConfig::default();
    config.front.enabled = true;
    config.front.balance = balance;
    config.listener.bind_address = "127.0.0.1:0".into();
    config.control.bind_address = "127.0.0.1:0".into();
    config.health_check.interval_secs = 3600;
    config.health_check.timeout_secs = 2;
    config
}

pub struct TestFront {
    pub launched: Launched,
    pub shutdown: Shutdown,
    pub control: ControlClient,
    pub http: reqwest::Client,
}

impl TestFront {
    pub async fn start(config: FrontConfig) -> Self {
        let shutdown = Shutdown::new();
        let launched = launch(&config, &shutdown).await.expect("gateway failed to start");
        let control = ControlClient::new(&launched.control_addr.to_string());
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .no_proxy()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();
        Self {
            launched,
            shutdown,
            control,
            http,
        }
    }

    pub fn gateway_url(&self, path: &str) -> String {
        format!("http://{}{}", self.launched.gateway_addr, path)
    }

    /// GET `path` through the gateway, returning status and body text.
    pub async fn get(&self, path: &str) -> (u16, String) {
        let res = self
            .http
            .get(self.gateway_url(path))
            .send()
            .await
            .expect("gateway unreachable");
        let status = res.status().as_u16();
        (status, res.text().await.unwrap())
    }

    /// Spawn a GET through the gateway that outlives the caller's borrow.
    pub fn get_in_background(&self, path: &str) -> JoinHandle<Result<reqwest::Response, reqwest::Error>> {
        let request = self.http.get(self.gateway_url(path));
        tokio::spawn(async move { request.send().await })
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        self.launched.wait_for(Duration::from_secs(5)).await;
    }
}
