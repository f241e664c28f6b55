//! CSRF token presence check for mutating API requests.
//!
//! Only the presence of a token is verified: a header value, or a field of a
//! JSON body. The token is not compared against any session-bound secret, so
//! this stage stops naive cross-site form posts and nothing more.

use axum::{
    body::Body,
    http::{header, Method, Request},
};

use crate::config::GuardConfig;
use crate::security::rejection::Rejection;

#[derive(Debug, Clone)]
pub struct CsrfPolicy {
    pub enabled: bool,
    pub api_prefix: String,
    pub header_name: String,
    pub body_field: String,
    pub exempt_suffixes: Vec<String>,
    pub max_body_bytes: usize,
}

impl From<&GuardConfig> for CsrfPolicy {
    fn from(config: &GuardConfig) -> Self {
        Self {
            enabled: config.csrf.enabled,
            api_prefix: config.rate_limit.api_prefix.clone(),
            header_name: config.csrf.header_name.to_ascii_lowercase(),
            body_field: config.csrf.body_field.clone(),
            exempt_suffixes: config.csrf.exempt_suffixes.clone(),
            max_body_bytes: config.csrf.max_body_bytes,
        }
    }
}

impl Default for CsrfPolicy {
    fn default() -> Self {
        Self::from(&GuardConfig::default())
    }
}

impl CsrfPolicy {
    /// Whether a request of this shape must carry a token.
    pub fn requires_token(&self, method: &Method, path: &str) -> bool {
        self.enabled
            && path.starts_with(&self.api_prefix)
            && !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
            && !self.exempt_suffixes.iter().any(|s| path.ends_with(s.as_str()))
    }

    /// Pass the request through if it carries a token.
    ///
    /// A JSON body is buffered to look for the token and then handed back
    /// intact. Bodies that are too large or fail to parse count as having no
    /// token.
    pub async fn check(&self, request: Request<Body>) -> Result<Request<Body>, Rejection> {
        if !self.requires_token(request.method(), request.uri().path()) {
            return Ok(request);
        }

        let header_token = request
            .headers()
            .get(self.header_name.as_str())
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| !v.is_empty());
        if header_token {
            return Ok(request);
        }

        let is_json = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.to_ascii_lowercase().contains("application/json"));
        if !is_json {
            return Err(Rejection::CsrfMissing);
        }

        let (parts, body) = request.into_parts();
        let bytes = match axum::body::to_bytes(body, self.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(error = %e, "Could not buffer body for CSRF token");
                return Err(Rejection::CsrfMissing);
            }
        };

        if body_has_token(&bytes, &self.body_field) {
            Ok(Request::from_parts(parts, Body::from(bytes)))
        } else {
            Err(Rejection::CsrfMissing)
        }
    }
}

fn body_has_token(bytes: &[u8], field: &str) -> bool {
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(value) => value
            .get(field)
            .and_then(|t| t.as_str())
            .is_some_and(|t| !t.is_empty()),
        Err(_) => false,
    }
}
