//! GitHub Users API source
//!
//! Fetches `GET /users/{login}` from the GitHub REST API (or a GitHub
//! Enterprise `/api/v3` root). When follower embedding is enabled, the first
//! page of `/users/{login}/followers` is fetched as well and folded into the
//! document so closed-world mutual queries have a list to inspect.

use super::{ProfileSource, SourceError};
use crate::config::SourceConfig;
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client, Response, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Maximum page size the followers endpoint accepts
const FOLLOWERS_PAGE_SIZE: u32 = 100;

/// GitHub REST client for user profiles
pub struct GitHubSource {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
    embed_followers: bool,
}

impl GitHubSource {
    /// Create a new GitHub source
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let user_agent = header::HeaderValue::from_str(&config.user_agent).map_err(|e| {
            crate::ProfileCacheError::Config(format!("Invalid user agent: {}", e))
        })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(header::USER_AGENT, user_agent);
                headers.insert(
                    header::ACCEPT,
                    header::HeaderValue::from_static("application/vnd.github.v3+json"),
                );
                headers
            })
            .build()?;

        Ok(Self {
            client,
            base_url: rest_base_url(&config.base_url),
            auth_token: config.resolved_token(),
            embed_followers: config.embed_followers,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn user_url(&self, identity: &str) -> String {
        format!("{}/users/{}", self.base_url, urlencoding::encode(identity))
    }

    async fn get_json(&self, url: &str, identity: &str) -> std::result::Result<Value, SourceError> {
        let mut request = self.client.get(url);
        if let Some(ref token) = self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            warn!(identity, url, error = %e, "Profile source request failed");
            SourceError::Unavailable(e.to_string())
        })?;

        match response.status() {
            StatusCode::OK => response
                .json()
                .await
                .map_err(|e| SourceError::Unavailable(format!("invalid response body: {}", e))),
            StatusCode::NOT_FOUND => Err(SourceError::NotFound(identity.to_string())),
            StatusCode::TOO_MANY_REQUESTS => Err(SourceError::RateLimited {
                retry_after: retry_after_secs(&response),
            }),
            StatusCode::FORBIDDEN if is_rate_limited(&response) => {
                Err(SourceError::RateLimited {
                    retry_after: retry_after_secs(&response),
                })
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                warn!(identity, status = %status, "Unexpected profile source status");
                Err(SourceError::Unavailable(format!(
                    "GitHub API error: HTTP {}: {}",
                    status, body
                )))
            }
        }
    }
}

#[async_trait]
impl ProfileSource for GitHubSource {
    async fn fetch_profile(&self, identity: &str) -> std::result::Result<Value, SourceError> {
        debug!(identity, "Fetching GitHub profile");

        let mut details = self.get_json(&self.user_url(identity), identity).await?;

        if self.embed_followers {
            let url = format!(
                "{}/followers?per_page={}",
                self.user_url(identity),
                FOLLOWERS_PAGE_SIZE
            );
            let followers = self.get_json(&url, identity).await?;
            embed_followers(&mut details, followers)?;
        }

        info!(identity, "Fetched GitHub profile");
        Ok(details)
    }
}

/// Map a configured URL to the REST API root
///
/// The github.com web host is rewritten to api.github.com. Any other host,
/// such as a GitHub Enterprise `/api/v3` root, is used as given.
fn rest_base_url(url: &str) -> String {
    let base = url.trim_end_matches('/');
    let is_web_host = Url::parse(base)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|host| host == "github.com" || host == "www.github.com");

    if is_web_host {
        "https://api.github.com".to_string()
    } else {
        base.to_string()
    }
}

/// Fold a follower list into a user document
///
/// GitHub reports `followers`/`following` as counts. The counts are kept under
/// `followers_count`/`following_count` and `followers` becomes the list.
/// Anything other than an object document and an array page is rejected so a
/// malformed response is never cached.
fn embed_followers(
    details: &mut Value,
    followers: Value,
) -> std::result::Result<(), SourceError> {
    let Value::Object(doc) = details else {
        return Err(SourceError::Unavailable("invalid profile response".into()));
    };
    let Value::Array(list) = followers else {
        return Err(SourceError::Unavailable("invalid followers response".into()));
    };

    if !doc.contains_key("followers_count") {
        if let Some(count) = doc.get("followers").filter(|v| v.is_number()).cloned() {
            doc.insert("followers_count".to_string(), count);
        }
    }
    if !doc.contains_key("following_count") {
        if let Some(count) = doc.get("following").filter(|v| v.is_number()).cloned() {
            doc.insert("following_count".to_string(), count);
        }
    }

    doc.insert("followers".to_string(), Value::Array(list));
    Ok(())
}

/// 403s from GitHub mean throttling when the quota is spent or a wait is requested
fn is_rate_limited(response: &Response) -> bool {
    let headers = response.headers();
    headers.contains_key(header::RETRY_AFTER)
        || headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim() == "0")
            .unwrap_or(false)
}

/// Seconds to wait, from `Retry-After` or the `x-ratelimit-reset` epoch
fn retry_after_secs(response: &Response) -> Option<u64> {
    let headers = response.headers();

    if let Some(secs) = headers
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
    {
        return Some(secs);
    }

    headers
        .get("x-ratelimit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(|reset| (reset - Utc::now().timestamp()).max(0) as u64)
}
