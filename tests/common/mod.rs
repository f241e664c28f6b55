//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, Request, StatusCode},
    response::IntoResponse,
    Router,
};
use edge_guard::config::GuardConfig;
use edge_guard::http::build_router;
use edge_guard::security::{AdmissionPolicy, AdmissionState, InMemoryStore, ManualClock, RateLimiter};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

pub const START_MILLIS: u64 = 1_700_000_000_000;

/// Downstream stand-in: echoes the request body and sets a header the
/// guard is expected to overwrite.
async fn echo(body: Bytes) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert("x-frame-options", "SAMEORIGIN".parse().unwrap());
    (StatusCode::OK, headers, body)
}

/// The full guard router in front of the echo downstream, on a manual clock.
pub fn guard_app(config: &GuardConfig) -> (Router, Arc<ManualClock>) {
    guard_app_with_policy(config, AdmissionPolicy::from_config(config))
}

/// Like [`guard_app`], with a hand-built admission policy.
pub fn guard_app_with_policy(
    config: &GuardConfig,
    policy: AdmissionPolicy,
) -> (Router, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START_MILLIS));
    let limiter = RateLimiter::new(Arc::new(InMemoryStore::new()), clock.clone());
    let admission = AdmissionState::new(policy, limiter);
    let downstream = Router::new().fallback(echo);
    (build_router(config, admission, downstream), clock)
}

pub fn get(path: &str, ip: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header("x-forwarded-for", ip)
        .body(Body::empty())
        .unwrap()
}

pub fn post(path: &str, ip: &str) -> axum::http::request::Builder {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("x-forwarded-for", ip)
}

pub async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Start a simple mock backend that returns a fixed response.
pub async fn start_mock_backend(addr: SocketAddr, response: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let response_str = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    response.len(),
                    response
                );
                let _ = socket.write_all(response_str.as_bytes()).await;
                let _ = socket.shutdown().await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            });
        }
    });
}
