//! Admission middleware.
//!
//! Runs the security stages in order for every non-excluded request and
//! decorates whatever the downstream application returns.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::observability::metrics;
use crate::security::client_ip::client_ip;
use crate::security::{AdmissionState, Rejection};

pub async fn admission_middleware(
    State(state): State<AdmissionState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let policy = state.policy();
    let path = request.uri().path().to_string();

    if policy.is_excluded(&path) {
        return next.run(request).await;
    }

    // 1. CORS
    if let Some(response) = policy.cors.check(&request) {
        if !response.status().is_success() {
            metrics::record_rejection("cors");
        }
        return response;
    }
    let origin = request.headers().get(header::ORIGIN).cloned();
    let client = client_ip(request.headers());

    // 2. Rate limit
    let limit_info = match state.limiter().check(&policy.rate_limit, &client, &path) {
        Ok(info) => info,
        Err(rejection) => return reject(rejection, &client, &path),
    };

    // 3. CSRF
    let request = match policy.csrf.check(request).await {
        Ok(request) => request,
        Err(rejection) => return reject(rejection, &client, &path),
    };

    tracing::debug!(client = %client, path = %path, "Request admitted");
    let mut response = next.run(request).await;

    // 4. Headers
    let headers = response.headers_mut();
    if let Some(info) = limit_info {
        info.apply(headers);
    }
    policy.cors.apply(origin.as_ref(), headers);
    policy.headers.apply(headers);
    response
}

fn reject(rejection: Rejection, client: &str, path: &str) -> Response {
    tracing::warn!(
        client = %client,
        path = %path,
        reason = rejection.reason(),
        "Request rejected"
    );
    metrics::record_rejection(rejection.reason());
    rejection.into_response()
}
