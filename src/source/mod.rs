//! Upstream profile source
//!
//! Read-only access to the external profile service. A source performs the
//! outbound request and nothing else: it never touches the store and never
//! retries. Retry policy, if any, belongs to the caller (see [`crate::retry`]).
//!
//! # Error taxonomy
//!
//! - [`SourceError::Unavailable`]: transport failure, timeout, or upstream 5xx
//! - [`SourceError::NotFound`]: the identity does not exist upstream
//! - [`SourceError::RateLimited`]: upstream throttling, with an optional wait hint

pub mod github;

pub use github::GitHubSource;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failure reaching or reading from the profile source
///
/// None of these are ever cached; a later resolve always retries the fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("Profile source unavailable: {0}")]
    Unavailable(String),

    #[error("Profile not found upstream: {0}")]
    NotFound(String),

    #[error("Profile source rate limited")]
    RateLimited {
        /// Seconds the upstream asked us to wait, when it said
        retry_after: Option<u64>,
    },
}

impl SourceError {
    /// Short label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Unavailable(_) => "unavailable",
            SourceError::NotFound(_) => "not_found",
            SourceError::RateLimited { .. } => "rate_limited",
        }
    }
}

/// Read-only accessor to an external profile service keyed by identity
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Fetch the profile document for `identity`
    async fn fetch_profile(&self, identity: &str) -> Result<Value, SourceError>;
}
