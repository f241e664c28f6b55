//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, limits > 0, durations and caps bounded)
//! - Check that addresses and the upstream URL parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GuardConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use tokio::sync::Semaphore;
use url::Url;

use crate::config::schema::{GuardConfig, PLACEHOLDER_API_KEY};

/// Longest accepted window or block: one year.
pub const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// Smallest non-zero registry cap.
pub const MIN_REGISTRY_ENTRIES: usize = 1024;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must be at most {max}")]
    TooLarge { field: &'static str, max: u64 },

    #[error("rate_limit.max_entries must be 0 (unbounded) or at least {}", MIN_REGISTRY_ENTRIES)]
    RegistryTooSmall,

    #[error("{field}: invalid socket address '{value}'")]
    BadAddress { field: &'static str, value: String },

    #[error("upstream.url: '{0}' is not an http URL")]
    BadUpstream(String),

    #[error("rate_limit.api_prefix must start with '/'")]
    BadApiPrefix,

    #[error("rate_limit.strict_paths: '{0}' is outside the api prefix")]
    StrictPathOutsideApi(String),

    #[error("admin.api_key must be changed before enabling the admin API")]
    PlaceholderApiKey,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero { field: "listener.max_connections" });
    } else if config.listener.max_connections > Semaphore::MAX_PERMITS {
        errors.push(ValidationError::TooLarge {
            field: "listener.max_connections",
            max: Semaphore::MAX_PERMITS as u64,
        });
    }

    match Url::parse(&config.upstream.url) {
        Ok(url) if url.scheme() == "http" && url.host().is_some() => {}
        _ => errors.push(ValidationError::BadUpstream(config.upstream.url.clone())),
    }
    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "upstream.timeout_secs" });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.request_secs" });
    }

    let rl = &config.rate_limit;
    check_duration(&mut errors, "rate_limit.window_secs", rl.window_secs);
    check_duration(&mut errors, "rate_limit.block_secs", rl.block_secs);
    if rl.default_limit == 0 {
        errors.push(ValidationError::Zero { field: "rate_limit.default_limit" });
    }
    if rl.strict_limit == 0 {
        errors.push(ValidationError::Zero { field: "rate_limit.strict_limit" });
    }
    if !rl.api_prefix.starts_with('/') {
        errors.push(ValidationError::BadApiPrefix);
    }
    if rl.max_entries > 0 && rl.max_entries < MIN_REGISTRY_ENTRIES {
        errors.push(ValidationError::RegistryTooSmall);
    }
    for path in &rl.strict_paths {
        if !path.starts_with(&rl.api_prefix) {
            errors.push(ValidationError::StrictPathOutsideApi(path.clone()));
        }
    }

    if config.csrf.max_body_bytes == 0 {
        errors.push(ValidationError::Zero { field: "csrf.max_body_bytes" });
    }

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_API_KEY {
            errors.push(ValidationError::PlaceholderApiKey);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_duration(errors: &mut Vec<ValidationError>, field: &'static str, secs: u64) {
    if secs == 0 {
        errors.push(ValidationError::Zero { field });
    } else if secs > MAX_DURATION_SECS {
        errors.push(ValidationError::TooLarge { field, max: MAX_DURATION_SECS });
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BadAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&GuardConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = GuardConfig::default();
        config.rate_limit.window_secs = 0;
        config.rate_limit.strict_limit = 0;
        config.upstream.url = "ftp://example.com".into();
        config.listener.bind_address = "not-an-address".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Zero { field: "rate_limit.window_secs" }));
        assert!(errors.contains(&ValidationError::BadUpstream("ftp://example.com".into())));
    }

    #[test]
    fn test_strict_path_must_live_under_api_prefix() {
        let mut config = GuardConfig::default();
        config.rate_limit.strict_paths.push("/auth/signin".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::StrictPathOutsideApi("/auth/signin".into())]);
    }

    #[test]
    fn test_admin_requires_real_key() {
        let mut config = GuardConfig::default();
        config.admin.enabled = true;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::PlaceholderApiKey]
        );

        config.admin.api_key = "s3cret".into();
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_oversized_values_are_rejected() {
        let mut config = GuardConfig::default();
        config.rate_limit.window_secs = u64::MAX / 1000;
        config.rate_limit.block_secs = MAX_DURATION_SECS + 1;
        config.listener.max_connections = usize::MAX;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::TooLarge {
                    field: "listener.max_connections",
                    max: Semaphore::MAX_PERMITS as u64,
                },
                ValidationError::TooLarge { field: "rate_limit.window_secs", max: MAX_DURATION_SECS },
                ValidationError::TooLarge { field: "rate_limit.block_secs", max: MAX_DURATION_SECS },
            ]
        );

        config = GuardConfig::default();
        config.rate_limit.window_secs = MAX_DURATION_SECS;
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_registry_cap_has_a_floor() {
        let mut config = GuardConfig::default();
        config.rate_limit.max_entries = 1;
        assert_eq!(validate_config(&config).unwrap_err(), vec![ValidationError::RegistryTooSmall]);

        config.rate_limit.max_entries = MIN_REGISTRY_ENTRIES;
        assert_eq!(validate_config(&config), Ok(()));
    }
}
