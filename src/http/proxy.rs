//! Forwarding admitted requests to the downstream application.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the configured upstream
//! - Strip hop-by-hop headers
//! - Map upstream failures to 502 / 504
//!
//! # Design Decisions
//! - Bodies are streamed, never buffered here
//! - No retries: a failed forward is a terminal response

use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use hyper::header::{CONNECTION, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE, TRAILER, TRANSFER_ENCODING, UPGRADE};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::config::UpstreamConfig;
use crate::http::request::request_id;

const HOP_BY_HOP: [hyper::header::HeaderName; 7] = [
    CONNECTION,
    PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION,
    TE,
    TRAILER,
    TRANSFER_ENCODING,
    UPGRADE,
];

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid upstream uri: {0}")]
    InvalidUri(#[from] axum::http::uri::InvalidUri),

    #[error("upstream request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),
}

impl IntoResponse for UpstreamError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            UpstreamError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "Upstream timeout"),
            UpstreamError::InvalidUri(_) | UpstreamError::Request(_) => {
                (StatusCode::BAD_GATEWAY, "Upstream request failed")
            }
        };
        (status, Json(serde_json::json!({ "error": error }))).into_response()
    }
}

/// HTTP client bound to one upstream base URL.
#[derive(Clone)]
pub struct Upstream {
    client: Client<HttpConnector, Body>,
    base: String,
    timeout: Duration,
}

impl Upstream {
    pub fn new(config: &UpstreamConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeout_secs)));

        Self {
            client: Client::builder(TokioExecutor::new()).build(connector),
            base: config.url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn target(&self, uri: &Uri) -> Result<Uri, UpstreamError> {
        let path_and_query = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
        Ok(format!("{}{}", self.base, path_and_query).parse()?)
    }

    /// Forward a request and return the upstream response.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response, UpstreamError> {
        let (mut parts, body) = request.into_parts();
        parts.uri = self.target(&parts.uri)?;
        strip_hop_by_hop(&mut parts.headers);

        let request = Request::from_parts(parts, body);
        let response = tokio::time::timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| UpstreamError::Timeout(self.timeout))??;

        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
}

/// Fallback handler: every admitted request goes upstream.
pub async fn proxy_handler(State(upstream): State<Upstream>, request: Request<Body>) -> Response {
    let id = request_id(&request).to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    tracing::debug!(request_id = %id, method = %method, path = %path, "Proxying request");

    match upstream.forward(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(request_id = %id, path = %path, error = %e, "Upstream error");
            e.into_response()
        }
    }
}
