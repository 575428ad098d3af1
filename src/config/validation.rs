//! Configuration validation
//!
//! Checks a ProfileCache configuration before the proxy starts:
//! - Listener port is usable
//! - Upstream base URL is http(s)
//! - Timeouts are non-zero
//! - The SQLite backend has a path

use super::proxy_config::{ProxyConfig, StoreBackend};
use crate::ProfileCacheError;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Validate a ProfileCache configuration, collecting every problem found
pub fn validate_config(config: &ProxyConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if config.server.port == 0 {
        errors.push(ValidationError::new(
            "server.port",
            "Port must be greater than 0",
        ));
    }

    if config.server.host.trim().is_empty() {
        errors.push(ValidationError::new("server.host", "Host cannot be empty"));
    }

    let base_url = &config.source.base_url;
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        errors.push(ValidationError::new(
            "source.base_url",
            format!("Invalid source URL: {}", base_url),
        ));
    }

    if config.source.timeout_secs == 0 {
        errors.push(ValidationError::new(
            "source.timeout_secs",
            "Timeout must be greater than 0",
        ));
    }

    if config.source.user_agent.trim().is_empty() {
        // GitHub rejects requests without a User-Agent
        errors.push(ValidationError::new(
            "source.user_agent",
            "User agent cannot be empty",
        ));
    }

    if config.resolver.fetch_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "resolver.fetch_timeout_secs",
            "Fetch timeout must be greater than 0",
        ));
    }

    if config.store.backend == StoreBackend::Sqlite && config.store.path.as_os_str().is_empty() {
        errors.push(ValidationError::new(
            "store.path",
            "SQLite backend requires a database path",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate configuration and return a Result
pub fn validate_config_result(config: &ProxyConfig) -> crate::Result<()> {
    validate_config(config).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        ProfileCacheError::Config(format!(
            "Configuration validation failed:\n  - {}",
            messages.join("\n  - ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::new()).is_ok());
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = ProxyConfig::new();
        config.source.base_url = "api.github.com".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "source.base_url");
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProxyConfig::new();
        config.server.port = 0;
        config.source.timeout_secs = 0;
        config.resolver.fetch_timeout_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_sqlite_requires_path() {
        let mut config = ProxyConfig::new();
        config.store.backend = StoreBackend::Sqlite;
        config.store.path = PathBuf::new();

        let result = validate_config_result(&config);
        match result {
            Err(ProfileCacheError::Config(msg)) => assert!(msg.contains("store.path")),
            other => panic!("expected config error, got {:?}", other),
        }
    }
}
