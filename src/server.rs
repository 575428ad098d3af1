//! HTTP boundary for the profile cache
//!
//! # Routes
//!
//! - `GET /user/{identity}` - Resolve a profile (cache hit or read-through fetch)
//! - `DELETE /user/{identity}` - Invalidate a cached profile (idempotent)
//! - `GET /user/{identity}/mutuals?candidates=a,b` - Closed-world mutual query
//! - `GET /health` - Liveness check
//! - `GET /metrics` - Prometheus metrics
//!
//! Upstream failures map to distinct statuses: not found is 404, unavailable
//! is 502, rate limited is 503 (with `Retry-After` when known).
//!
//! # Example
//!
//! ```no_run
//! use profilecache::config::ProxyConfig;
//! use profilecache::server::ProxyServer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ProxyConfig::new();
//!     let server = ProxyServer::from_config(&config).expect("Failed to create server");
//!     server.run(&config.server.bind_addr()).await.expect("Server failed");
//! }
//! ```

use crate::config::ProxyConfig;
use crate::metrics;
use crate::relationship::{mutuals, RelationshipQuery};
use crate::resolver::CacheResolver;
use crate::source::{GitHubSource, SourceError};
use crate::store::open_store;
use crate::{ProfileCacheError, Result};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared server state
struct AppState {
    resolver: CacheResolver,
}

/// HTTP server exposing resolve and invalidate
pub struct ProxyServer {
    state: Arc<AppState>,
}

impl ProxyServer {
    /// Create a server around an already-built resolver
    pub fn new(resolver: CacheResolver) -> Self {
        Self {
            state: Arc::new(AppState { resolver }),
        }
    }

    /// Build the store, GitHub source, and resolver described by `config`
    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        let store = open_store(&config.store)?;
        let source = Arc::new(GitHubSource::new(&config.source)?);
        Ok(Self::new(CacheResolver::new(store, source, &config.resolver)))
    }

    fn router(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics_text))
            .route("/user/{identity}", get(get_user).delete(delete_user))
            .route("/user/{identity}/mutuals", get(get_mutuals))
            .with_state(state)
    }

    /// The router, for embedding or in-process testing
    pub fn into_router(self) -> Router {
        Self::router(self.state)
    }

    /// Run the server on the given address
    pub async fn run(self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ProfileCacheError::Server(format!("bind {}: {}", addr, e)))?;

        tracing::info!(
            addr = addr,
            single_flight = self.state.resolver.is_single_flight(),
            "Profile cache listening"
        );

        axum::serve(listener, Self::router(self.state))
            .await
            .map_err(ProfileCacheError::Io)
    }

    /// The resolver behind this server
    pub fn resolver(&self) -> &CacheResolver {
        &self.state.resolver
    }
}

// ============================================================================
// Request/Response types
// ============================================================================

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response from invalidating a profile
#[derive(Debug, Serialize, Deserialize)]
pub struct InvalidateResponse {
    pub message: String,
    /// Whether a cached entry was actually removed
    pub deleted: bool,
}

#[derive(Debug, Deserialize)]
pub struct MutualsParams {
    /// Comma-separated candidate identities
    pub candidates: Option<String>,
}

/// Response from a mutual relationship query
#[derive(Debug, Serialize, Deserialize)]
pub struct MutualsResponse {
    pub subject: String,
    pub mutuals: Vec<String>,
}

/// Boundary mapping for core errors
struct ApiError(ProfileCacheError);

impl From<ProfileCacheError> for ApiError {
    fn from(err: ProfileCacheError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.as_source() {
            Some(SourceError::NotFound(_)) => StatusCode::NOT_FOUND,
            Some(SourceError::Unavailable(_)) => StatusCode::BAD_GATEWAY,
            Some(SourceError::RateLimited { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            None => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "Request failed");
        }

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });

        match self.0.as_source() {
            Some(SourceError::RateLimited {
                retry_after: Some(secs),
            }) => (status, [(header::RETRY_AFTER, secs.to_string())], body).into_response(),
            _ => (status, body).into_response(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn metrics_text() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::encode_metrics(),
    )
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(identity): Path<String>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let snapshot = state.resolver.resolve(&identity).await?;
    Ok(Json(snapshot.details))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(identity): Path<String>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let deleted = state.resolver.store().delete(&identity)?;
    metrics::record_invalidation(deleted);
    tracing::info!(identity = %identity, deleted, "Invalidated profile");

    Ok(Json(InvalidateResponse {
        message: "User deleted".to_string(),
        deleted,
    }))
}

async fn get_mutuals(
    State(state): State<Arc<AppState>>,
    Path(identity): Path<String>,
    Query(params): Query<MutualsParams>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let store = state.resolver.store().as_ref();

    let result = match params.candidates {
        Some(list) => {
            let candidates: Vec<String> = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            mutuals(store, &identity, &candidates)?
        }
        // Default to the subject's own cached followers
        None => match store.get(&identity)? {
            Some(subject) => RelationshipQuery::from_followers(&subject).resolve(store)?,
            None => Vec::new(),
        },
    };

    Ok(Json(MutualsResponse {
        subject: identity,
        mutuals: result,
    }))
}
