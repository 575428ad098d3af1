//! ProfileCache - Read-through caching proxy for GitHub profiles
//!
//! Serves user profiles by identity, fetching each from the upstream API on
//! first request and from a local store afterwards. Entries live until they
//! are explicitly invalidated; there is no expiry.
//!
//! # Architecture
//!
//! - **store**: Entity store keyed by identity (in-memory or SQLite)
//! - **source**: Read-only upstream profile client (GitHub REST)
//! - **resolver**: Get-or-fetch orchestration with optional single-flight
//! - **relationship**: Closed-world mutual follower queries over the store
//! - **server**: HTTP boundary (resolve, invalidate, mutuals)
//! - **config**: YAML configuration and validation

// Core modules
pub mod config;
pub mod error;
pub mod profile;
pub mod store;

// Components
pub mod relationship;
pub mod resolver;
pub mod server;
pub mod source;

// Ambient
pub mod logging;
pub mod metrics;
pub mod retry;

// Re-exports
pub use error::{ProfileCacheError, Result};
pub use profile::ProfileSnapshot;
