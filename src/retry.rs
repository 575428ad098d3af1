//! Caller-side retry with exponential backoff
//!
//! The profile source never retries on its own. Callers that want to ride out
//! upstream throttling or flaky connectivity (the `warm` command) wrap their
//! resolves in [`with_retry`].

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt)
    pub max_retries: u32,

    /// Backoff before the first retry
    pub initial_backoff: Duration,

    /// Upper bound for any single wait, including upstream `Retry-After` hints
    pub max_backoff: Duration,

    /// Backoff multiplier
    pub multiplier: f64,

    /// Add up to 25% jitter so warmers started together spread out
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Config with the given retry count and default backoff curve
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Backoff to wait after the given (zero-based) failed attempt
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_backoff.as_secs_f64());

        if self.jitter {
            Duration::from_secs_f64(capped * (1.0 + jitter_fraction() * 0.25))
        } else {
            Duration::from_secs_f64(capped)
        }
    }
}

/// Pseudo-random value in [0.0, 1.0) taken from the clock's sub-second nanos
fn jitter_fraction() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as f64 / 1000.0
}

/// Retry classification for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry using the configured backoff
    Retry,
    /// Retry after a specific duration (e.g., from a Retry-After header)
    RetryAfter(Duration),
    /// Permanent failure
    NoRetry,
}

/// Errors that know whether waiting could help
pub trait RetryableError {
    fn retry_decision(&self) -> RetryDecision;
}

/// Execute an async operation, retrying transient failures
///
/// Returns the first success, the first non-retryable error, or the last
/// error once `max_retries` is exhausted.
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError + std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let backoff = match err.retry_decision() {
            RetryDecision::NoRetry => {
                debug!(operation = operation_name, attempt, error = %err, "Not retrying");
                return Err(err);
            }
            _ if attempt >= config.max_retries => {
                warn!(
                    operation = operation_name,
                    attempts = attempt + 1,
                    error = %err,
                    "Giving up after retries"
                );
                return Err(err);
            }
            RetryDecision::RetryAfter(hint) => hint.min(config.max_backoff),
            RetryDecision::Retry => config.backoff_duration(attempt),
        };

        warn!(
            operation = operation_name,
            attempt = attempt + 1,
            max_attempts = config.max_retries + 1,
            backoff_secs = backoff.as_secs_f64(),
            error = %err,
            "Retrying after error"
        );

        sleep(backoff).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceError;

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            multiplier: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn test_backoff_duration() {
        let config = RetryConfig {
            jitter: false,
            ..Default::default()
        };

        assert_eq!(config.backoff_duration(0), Duration::from_secs(1));
        assert_eq!(config.backoff_duration(2), Duration::from_secs(4));
        assert_eq!(config.backoff_duration(10), Duration::from_secs(60)); // Capped
    }

    #[test]
    fn test_backoff_with_jitter() {
        let config = RetryConfig::default();
        let backoff = config.backoff_duration(0);
        assert!(backoff >= Duration::from_secs(1));
        assert!(backoff <= Duration::from_millis(1250));
    }

    #[tokio::test]
    async fn test_retry_recovers_from_unavailable() {
        let mut attempts = 0;

        let result: Result<&str, SourceError> = with_retry(&fast_config(3), "test", || {
            attempts += 1;
            let current = attempts;
            async move {
                if current < 3 {
                    Err(SourceError::Unavailable("connection reset".into()))
                } else {
                    Ok("profile")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "profile");
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_rate_limit_hint_is_capped() {
        let mut attempts = 0;

        let result: Result<(), SourceError> = with_retry(&fast_config(1), "test", || {
            attempts += 1;
            async {
                Err(SourceError::RateLimited {
                    retry_after: Some(3600),
                })
            }
        })
        .await;

        // Hint capped at max_backoff, so this finishes quickly
        assert!(result.is_err());
        assert_eq!(attempts, 2);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let mut attempts = 0;

        let result: Result<(), SourceError> = with_retry(&fast_config(5), "test", || {
            attempts += 1;
            async { Err(SourceError::NotFound("ghost".into())) }
        })
        .await;

        assert!(matches!(result, Err(SourceError::NotFound(_))));
        assert_eq!(attempts, 1);
    }
}
