//! Admission policy and shared state.
//!
//! The policy is derived from configuration and replaced wholesale on reload.
//! The rate limiter (and the registry behind it) lives outside the policy so
//! counters and blocks survive a reload.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::GuardConfig;
use crate::security::cors::{AllowListCors, CorsPolicy};
use crate::security::csrf::CsrfPolicy;
use crate::security::headers::SecurityHeaders;
use crate::security::rate_limit::{RateLimitPolicy, RateLimiter};

/// Everything the admission chain needs to decide on a request.
pub struct AdmissionPolicy {
    pub cors: Arc<dyn CorsPolicy>,
    pub rate_limit: RateLimitPolicy,
    pub csrf: CsrfPolicy,
    pub headers: SecurityHeaders,
    pub excluded_prefixes: Vec<String>,
}

impl AdmissionPolicy {
    pub fn from_config(config: &GuardConfig) -> Self {
        Self {
            cors: Arc::new(AllowListCors::from(&config.cors)),
            rate_limit: RateLimitPolicy::from(&config.rate_limit),
            csrf: CsrfPolicy::from(config),
            headers: SecurityHeaders::new(
                config.headers.enabled,
                &config.headers.content_security_policy,
            ),
            excluded_prefixes: config.matcher.excluded_prefixes.clone(),
        }
    }

    /// Replace the CORS collaborator. A config reload rebuilds the policy
    /// and reinstates the allow-list from `cors`.
    pub fn with_cors(mut self, cors: Arc<dyn CorsPolicy>) -> Self {
        self.cors = cors;
        self
    }

    /// Static assets and the like skip the chain entirely.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_prefixes
            .iter()
            .any(|p| path.starts_with(p.as_str()))
    }
}

/// State handed to the admission middleware.
#[derive(Clone)]
pub struct AdmissionState {
    policy: Arc<ArcSwap<AdmissionPolicy>>,
    limiter: RateLimiter,
}

impl AdmissionState {
    pub fn new(policy: AdmissionPolicy, limiter: RateLimiter) -> Self {
        Self {
            policy: Arc::new(ArcSwap::from_pointee(policy)),
            limiter,
        }
    }

    pub fn policy(&self) -> Arc<AdmissionPolicy> {
        self.policy.load_full()
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Install a new policy built from `config`.
    pub fn reload(&self, config: &GuardConfig) {
        self.policy.store(Arc::new(AdmissionPolicy::from_config(config)));
        tracing::info!(
            default_limit = config.rate_limit.default_limit,
            strict_limit = config.rate_limit.strict_limit,
            window_secs = config.rate_limit.window_secs,
            "Admission policy reloaded"
        );
    }
}
