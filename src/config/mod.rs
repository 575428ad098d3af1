//! Configuration system
//!
//! Loads ~/.config/profilecache/config.yaml with sections for:
//! - The HTTP listener
//! - The upstream profile source (GitHub)
//! - The store backend (memory or SQLite)
//! - Resolver behavior (single-flight, fetch timeout)

mod proxy_config;
pub mod validation;

pub use proxy_config::{
    ProxyConfig, ResolverConfig, ServerConfig, SourceConfig, StoreBackend, StoreConfig,
};
pub use validation::{validate_config, validate_config_result, ValidationError};
