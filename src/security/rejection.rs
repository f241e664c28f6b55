//! Terminal admission failures and their HTTP form.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::security::rate_limit::{PathClass, RateLimitInfo};

/// Why a request was turned away.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The request origin is not on the allow-list.
    #[error("origin not allowed")]
    CorsDenied,

    /// The client IP is serving a hard block.
    #[error("client blocked for another {retry_after_secs}s")]
    Blocked { retry_after_secs: u64 },

    /// The request pushed its bucket past the threshold.
    #[error("{class:?} rate limit exceeded")]
    RateLimitExceeded {
        class: PathClass,
        info: RateLimitInfo,
        retry_after_secs: u64,
    },

    /// A mutating API request carried no CSRF token.
    #[error("missing CSRF token")]
    CsrfMissing,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

impl Rejection {
    /// Stable label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::CorsDenied => "cors",
            Rejection::Blocked { .. } => "blocked",
            Rejection::RateLimitExceeded { class: PathClass::Strict, .. } => "strict_limit",
            Rejection::RateLimitExceeded { class: PathClass::Default, .. } => "rate_limit",
            Rejection::CsrfMissing => "csrf",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::CorsDenied | Rejection::CsrfMissing => StatusCode::FORBIDDEN,
            Rejection::Blocked { .. } | Rejection::RateLimitExceeded { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
        }
    }

    fn body(&self) -> ErrorBody {
        let (error, message) = match self {
            Rejection::CorsDenied => ("Origin not allowed", None),
            Rejection::Blocked { .. } => (
                "Too many requests",
                Some("Your IP has been temporarily blocked due to too many failed attempts. Try again later."),
            ),
            Rejection::RateLimitExceeded { class: PathClass::Strict, .. } => (
                "Too many login attempts",
                Some("Too many authentication attempts. Your IP has been temporarily blocked."),
            ),
            Rejection::RateLimitExceeded { class: PathClass::Default, .. } => (
                "Rate limit exceeded",
                Some("Too many requests. Please try again later."),
            ),
            Rejection::CsrfMissing => ("Invalid CSRF token", None),
        };
        ErrorBody { error, message }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.body())).into_response();
        let headers = response.headers_mut();

        match &self {
            Rejection::Blocked { retry_after_secs } => {
                headers.insert(header::RETRY_AFTER, HeaderValue::from(*retry_after_secs));
            }
            Rejection::RateLimitExceeded { info, retry_after_secs, .. } => {
                headers.insert(header::RETRY_AFTER, HeaderValue::from(*retry_after_secs));
                RateLimitInfo { remaining: 0, ..*info }.apply(headers);
            }
            Rejection::CorsDenied | Rejection::CsrfMissing => {}
        }

        response
    }
}
