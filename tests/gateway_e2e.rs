//! End-to-end tests: registration over the control listener, traffic over the
//! gateway listener.

use front_gateway::control::{ClientError, RpcResponse};
use serde_json::json;

mod common;

use common::{start_echo_backend, start_mock_backend, test_config, TestFront};

#[tokio::test]
async fn test_register_proxy_deregister() {
    let front = TestFront::start(test_config(false)).await;
    let backend = start_mock_backend("hi").await;

    front.control.update("/svc", &backend.url()).await.unwrap();
    assert_eq!(front.get("/svc/hello").await, (200, "hi".to_string()));

    front.control.delete("/svc", &backend.url()).await.unwrap();
    assert_eq!(
        front.get("/svc/hello").await,
        (500, "No server available.".to_string())
    );

    // The emptied cluster is still listed.
    let clusters = front.control.clusters().await.unwrap();
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].prefix, "/svc");
    assert!(clusters[0].endpoints.is_empty());

    backend.kill().await;
    front.stop().await;
}

#[tokio::test]
async fn test_empty_registry_and_unmatched_path() {
    let front = TestFront::start(test_config(false)).await;

    assert_eq!(
        front.get("/anything").await,
        (500, "No server registered.".to_string())
    );

    let backend = start_mock_backend("api").await;
    front.control.update("/api", &backend.url()).await.unwrap();
    assert_eq!(
        front.get("/other").await,
        (500, "No handler matched.".to_string())
    );
    assert_eq!(front.get("/api/users").await, (200, "api".to_string()));

    backend.kill().await;
    front.stop().await;
}

#[tokio::test]
async fn test_longest_prefix_wins() {
    let front = TestFront::start(test_config(false)).await;
    let short = start_mock_backend("short").await;
    let long = start_mock_backend("long").await;

    front.control.update("/a", &short.url()).await.unwrap();
    front.control.update("/a/b", &long.url()).await.unwrap();

    assert_eq!(front.get("/a/b/c").await, (200, "long".to_string()));
    assert_eq!(front.get("/a/c").await, (200, "short".to_string()));
    assert_eq!(front.get("/a").await, (200, "short".to_string()));

    short.kill().await;
    long.kill().await;
    front.stop().await;
}

#[tokio::test]
async fn test_request_forwarded_with_path_and_client_address() {
    let front = TestFront::start(test_config(false)).await;
    let echo = start_echo_backend().await;

    front.control.update("/svc", &echo.url()).await.unwrap();

    let (status, body) = front.get("/svc/items?page=2").await;
    assert_eq!(status, 200);
    assert_eq!(body, "/svc/items?page=2|127.0.0.1");

    echo.kill().await;
    front.stop().await;
}

#[tokio::test]
async fn test_invalid_registration_is_rejected() {
    let front = TestFront::start(test_config(false)).await;

    let err = front.control.update("/svc", "not a url").await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected { .. }));
    let err = front.control.update("", "http://127.0.0.1:1").await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected { .. }));

    assert!(front.control.clusters().await.unwrap().is_empty());
    front.stop().await;
}

#[tokio::test]
async fn test_raw_rpc_envelope() {
    let front = TestFront::start(test_config(false)).await;
    let rpc_url = format!("http://{}/rpc", front.launched.control_addr);

    let reply: RpcResponse = front
        .http
        .post(&rpc_url)
        .json(&json!({"id": 7, "method": "Handle.Bogus", "params": ["/svc", "http://h1"]}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reply.id, json!(7));
    assert_eq!(reply.error.as_deref(), Some("rpc: can't find method Handle.Bogus"));

    let reply: RpcResponse = front
        .http
        .post(&rpc_url)
        .json(&json!({"id": 8, "method": "Handle.Update", "params": ["/svc"]}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(reply.error.unwrap().starts_with("Invalid parameters!"));

    front.stop().await;
}

#[tokio::test]
async fn test_status_counts_requests() {
    let front = TestFront::start(test_config(true)).await;

    front.get("/x").await;
    front.get("/y").await;

    let status = front.control.status().await.unwrap();
    assert_eq!(status.requests, 2);
    assert_eq!(status.mode, "balanced");

    front.stop().await;
}
