//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ClientConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ClientConfig, ConfigError> {
    let config: ClientConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
            [http]
            user_agent = "orders-service"

            [observability]
            log_level = "debug"

            [[endpoints]]
            name = "ExternalApi"
            base_address = "https://api.github.com/"

            [endpoints.circuit_breaker]
            failure_threshold = 2
            cooldown_ms = 500

            [endpoints.timeouts]
            attempt_ms = 1000
            call_ms = 4000
            "#,
        )
        .unwrap();

        let endpoint = config.endpoint("ExternalApi").unwrap();
        assert_eq!(endpoint.circuit_breaker.failure_threshold, 2);
        assert_eq!(endpoint.timeouts.call_ms, 4000);
        assert_eq!(config.http.user_agent, "orders-service");
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_validation_errors_are_reported() {
        let err = parse_config(
            r#"
            [[endpoints]]
            name = "A"
            base_address = "http://a/"
            [endpoints.timeouts]
            call_ms = 0
            "#,
        )
        .unwrap_err();

        match err {
            ConfigError::Validation(errors) => assert!(!errors.is_empty()),
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
