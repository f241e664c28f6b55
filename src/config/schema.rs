//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the admission gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Listener configuration (bind address, connection cap).
    pub listener: ListenerConfig,

    /// Downstream application that admitted requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// CSRF presence check configuration.
    pub csrf: CsrfConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Security response headers.
    pub headers: HeadersConfig,

    /// Paths that bypass the admission filter entirely.
    pub matcher: MatcherConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent in-flight requests (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Downstream application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the site (e.g., "http://127.0.0.1:3000").
    pub url: String,

    /// Per-request upstream timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3000".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Timeout configuration for the listener side.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Sliding-window rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Requests per window for ordinary API paths.
    pub default_limit: u32,

    /// Requests per window for authentication paths.
    pub strict_limit: u32,

    /// How long an IP stays blocked after exceeding the strict limit.
    pub block_secs: u64,

    /// Prefix that marks a path as an API route.
    pub api_prefix: String,

    /// Path prefixes held to the strict limit.
    pub strict_paths: Vec<String>,

    /// Registry size cap. `0` leaves the registry unbounded.
    pub max_entries: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 15 * 60,
            default_limit: 100,
            strict_limit: 5,
            block_secs: 60 * 60,
            api_prefix: "/api/".to_string(),
            strict_paths: vec![
                "/api/auth/signin".to_string(),
                "/api/auth/signup".to_string(),
                "/api/auth/2fa/setup".to_string(),
                "/api/auth/2fa/verify".to_string(),
                "/api/auth/2fa/disable".to_string(),
                "/api/auth/2fa/login-verify".to_string(),
            ],
            max_entries: 0,
        }
    }
}

/// CSRF token presence check.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Enable the check.
    pub enabled: bool,

    /// Header carrying the token.
    pub header_name: String,

    /// JSON body field carrying the token.
    pub body_field: String,

    /// Path suffixes that never require a token.
    pub exempt_suffixes: Vec<String>,

    /// Largest body buffered while looking for the token.
    pub max_body_bytes: usize,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            header_name: "x-csrf-token".to_string(),
            body_field: "_csrf".to_string(),
            exempt_suffixes: vec!["/login".to_string(), "/signup".to_string()],
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Origin allow-list. An empty list disables the CORS stage.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allowed_headers: ["content-type", "authorization", "x-csrf-token"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            max_age_secs: 86_400,
        }
    }
}

/// Security response headers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeadersConfig {
    /// Stamp security headers on admitted responses.
    pub enabled: bool,

    /// Value of the Content-Security-Policy header.
    pub content_security_policy: String,
}

impl Default for HeadersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            content_security_policy: crate::security::headers::DEFAULT_CSP.to_string(),
        }
    }
}

/// Requests under these prefixes skip admission (static assets).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub excluded_prefixes: Vec<String>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            excluded_prefixes: vec![
                "/_next/static".to_string(),
                "/_next/image".to_string(),
                "/favicon.ico".to_string(),
                "/public/".to_string(),
            ],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Placeholder admin key; rejected by validation when admin is enabled.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
