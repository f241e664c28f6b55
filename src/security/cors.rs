//! Cross-origin policy.
//!
//! The admission chain only needs one question answered: does this request
//! get a response right here (preflight, refused origin) or does it continue?
//! [`CorsPolicy`] is that seam; [`AllowListCors`] is the configured policy.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};

use crate::config::CorsConfig;
use crate::security::rejection::Rejection;

pub trait CorsPolicy: Send + Sync {
    /// `Some` answers the request directly and ends the admission chain.
    fn check(&self, request: &Request<Body>) -> Option<Response>;

    /// Decorate a pass-through response for the given request origin.
    fn apply(&self, _origin: Option<&HeaderValue>, _headers: &mut HeaderMap) {}
}

/// Origin allow-list. An empty list disables the policy.
#[derive(Debug, Clone)]
pub struct AllowListCors {
    origins: Vec<String>,
    methods: String,
    headers: String,
    max_age_secs: u64,
}

impl From<&CorsConfig> for AllowListCors {
    fn from(config: &CorsConfig) -> Self {
        Self {
            origins: config
                .allowed_origins
                .iter()
                .map(|o| o.trim_end_matches('/').to_string())
                .collect(),
            methods: config.allowed_methods.join(", "),
            headers: config.allowed_headers.join(", "),
            max_age_secs: config.max_age_secs,
        }
    }
}

impl AllowListCors {
    fn enabled(&self) -> bool {
        !self.origins.is_empty()
    }

    fn allows(&self, origin: &str) -> bool {
        self.origins.iter().any(|o| o == "*" || o == origin)
    }
}

impl CorsPolicy for AllowListCors {
    fn check(&self, request: &Request<Body>) -> Option<Response> {
        if !self.enabled() {
            return None;
        }
        let origin = request.headers().get(header::ORIGIN)?;

        let allowed = origin.to_str().map(|o| self.allows(o)).unwrap_or(false);
        if !allowed {
            tracing::debug!(origin = ?origin, "Origin refused");
            return Some(Rejection::CorsDenied.into_response());
        }

        if request.method() != Method::OPTIONS {
            return None;
        }

        let mut response = StatusCode::NO_CONTENT.into_response();
        let headers = response.headers_mut();
        self.apply(Some(origin), headers);
        if let Ok(v) = HeaderValue::from_str(&self.methods) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, v);
        }
        if let Ok(v) = HeaderValue::from_str(&self.headers) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, v);
        }
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from(self.max_age_secs));
        Some(response)
    }

    fn apply(&self, origin: Option<&HeaderValue>, headers: &mut HeaderMap) {
        let Some(origin) = origin else { return };
        if !self.enabled() || !origin.to_str().map(|o| self.allows(o)).unwrap_or(false) {
            return;
        }
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AllowListCors {
        AllowListCors::from(&CorsConfig {
            allowed_origins: vec!["https://blog.example.com/".into()],
            ..CorsConfig::default()
        })
    }

    fn request(method: Method, origin: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri("/api/posts");
        if let Some(o) = origin {
            builder = builder.header("origin", o);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_no_origin_is_not_applicable() {
        assert!(policy().check(&request(Method::POST, None)).is_none());
    }

    #[test]
    fn test_preflight_from_allowed_origin() {
        let response = policy()
            .check(&request(Method::OPTIONS, Some("https://blog.example.com")))
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let h = response.headers();
        assert_eq!(h.get("access-control-allow-origin").unwrap(), "https://blog.example.com");
        assert_eq!(h.get("access-control-max-age").unwrap(), "86400");
        assert!(h.get("access-control-allow-methods").unwrap().to_str().unwrap().contains("POST"));
    }

    #[test]
    fn test_simple_request_from_allowed_origin_continues() {
        assert!(policy()
            .check(&request(Method::POST, Some("https://blog.example.com")))
            .is_none());
    }

    #[test]
    fn test_apply_decorates_allowed_origin_only() {
        let mut headers = HeaderMap::new();
        policy().apply(Some(&HeaderValue::from_static("https://blog.example.com")), &mut headers);
        assert_eq!(headers["access-control-allow-origin"], "https://blog.example.com");
        assert_eq!(headers["vary"], "Origin");

        let mut headers = HeaderMap::new();
        policy().apply(Some(&HeaderValue::from_static("https://evil.example")), &mut headers);
        assert!(headers.is_empty());
    }

    #[test]
    fn test_foreign_origin_is_refused() {
        let response = policy()
            .check(&request(Method::POST, Some("https://evil.example")))
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_empty_allow_list_disables_policy() {
        let policy = AllowListCors::from(&CorsConfig::default());
        assert!(policy.check(&request(Method::OPTIONS, Some("https://evil.example"))).is_none());
    }
}
