//! Security response headers.
//!
//! # Responsibilities
//! - Stamp hardening headers on every admitted response
//!
//! # Design Decisions
//! - Headers are fixed and path-independent; only the CSP string is configurable
//! - Existing values from the downstream application are overwritten
//! - Early rejections do not get these headers

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

pub const DEFAULT_CSP: &str = "default-src 'self'; \
script-src 'self' 'unsafe-inline' 'unsafe-eval'; \
style-src 'self' 'unsafe-inline'; \
img-src 'self' data: https:; \
font-src 'self' data:; \
connect-src 'self'; \
frame-ancestors 'none'";

const FIXED: [(HeaderName, &str); 4] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::X_XSS_PROTECTION, "1; mode=block"),
    (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
];

/// Security headers with a pre-validated CSP value.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    enabled: bool,
    csp: HeaderValue,
}

impl SecurityHeaders {
    /// Falls back to [`DEFAULT_CSP`] if `csp` is not a valid header value.
    pub fn new(enabled: bool, csp: &str) -> Self {
        let csp = HeaderValue::from_str(csp).unwrap_or_else(|_| {
            tracing::warn!("Invalid Content-Security-Policy in config, using default");
            HeaderValue::from_static(DEFAULT_CSP)
        });
        Self { enabled, csp }
    }

    pub fn apply(&self, headers: &mut HeaderMap) {
        if !self.enabled {
            return;
        }
        for (name, value) in FIXED {
            headers.insert(name, HeaderValue::from_static(value));
        }
        headers.insert(header::CONTENT_SECURITY_POLICY, self.csp.clone());
    }
}

impl Default for SecurityHeaders {
    fn default() -> Self {
        Self::new(true, DEFAULT_CSP)
    }
}
