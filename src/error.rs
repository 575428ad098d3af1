//! Error types for ProfileCache
//!
//! Defines the crate-wide error enum covering store, upstream, and
//! configuration failures. Uses thiserror for ergonomic error handling.

use crate::retry::{RetryDecision, RetryableError};
use crate::source::SourceError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for ProfileCache operations
pub type Result<T> = std::result::Result<T, ProfileCacheError>;

/// Comprehensive error type for ProfileCache operations
#[derive(Error, Debug)]
pub enum ProfileCacheError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream profile source errors
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Storage errors not covered by the database driver
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// SQLite database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server bind/serve errors
    #[error("Server error: {0}")]
    Server(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl ProfileCacheError {
    /// Returns the upstream error kind, if this error came from the profile source
    pub fn as_source(&self) -> Option<&SourceError> {
        match self {
            ProfileCacheError::Source(e) => Some(e),
            _ => None,
        }
    }
}

impl RetryableError for SourceError {
    fn retry_decision(&self) -> RetryDecision {
        match self {
            SourceError::Unavailable(_) => RetryDecision::Retry,
            SourceError::RateLimited {
                retry_after: Some(secs),
            } => RetryDecision::RetryAfter(Duration::from_secs(*secs)),
            SourceError::RateLimited { retry_after: None } => {
                RetryDecision::RetryAfter(Duration::from_secs(60))
            }
            SourceError::NotFound(_) => RetryDecision::NoRetry,
        }
    }
}

impl RetryableError for ProfileCacheError {
    fn retry_decision(&self) -> RetryDecision {
        match self {
            ProfileCacheError::Source(e) => e.retry_decision(),
            // Local failures are not fixed by waiting
            ProfileCacheError::Config(_)
            | ProfileCacheError::Storage(_)
            | ProfileCacheError::Io(_)
            | ProfileCacheError::Json(_)
            | ProfileCacheError::Yaml(_)
            | ProfileCacheError::Database(_)
            | ProfileCacheError::Http(_)
            | ProfileCacheError::Server(_)
            | ProfileCacheError::Other(_) => RetryDecision::NoRetry,
        }
    }
}
