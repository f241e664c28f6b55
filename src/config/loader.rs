//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GuardConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GuardConfig, ConfigError> {
    let config: GuardConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GuardConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overrides() {
        let config = parse_config(
            r#"
            [upstream]
            url = "http://10.0.0.5:3000"

            [rate_limit]
            window_secs = 60
            strict_paths = ["/api/auth/signin"]

            [cors]
            allowed_origins = ["https://blog.example.com"]
            "#,
        )
        .unwrap();

        assert_eq!(config.upstream.url, "http://10.0.0.5:3000");
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.rate_limit.strict_paths, vec!["/api/auth/signin".to_string()]);
        assert_eq!(config.cors.allowed_origins.len(), 1);
    }

    #[test]
    fn test_validation_errors_surface() {
        let err = parse_config("[rate_limit]\ndefault_limit = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if e.len() == 1));
        assert_eq!(
            err.to_string(),
            "Validation failed: rate_limit.default_limit must be greater than zero"
        );
    }

    #[test]
    fn test_syntax_errors_surface() {
        assert!(matches!(parse_config("[rate_limit"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
