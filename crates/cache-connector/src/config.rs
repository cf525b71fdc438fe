//! # Connector Configuration
//!
//! Environment-based configuration for cache connectors.

use std::env;
use std::time::Duration;

/// Default store address when nothing is configured
pub const DEFAULT_ADDRESS: &str = "redis://127.0.0.1:6379";

/// Cache connector configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Store address, either `host:port` or a full `redis://` URL
    pub address: String,

    /// TTL applied by callers that do not pick one; zero means no expiration
    pub default_ttl: Duration,
}

impl CacheConfig {
    /// Config bound to `address` with no default expiration
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            default_ttl: Duration::ZERO,
        }
    }

    /// Load configuration from environment variables
    ///
    /// `CACHE_ADDR` wins over `REDIS_URL`; `CACHE_DEFAULT_TTL_SECS` sets the
    /// default TTL.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            address: lookup("CACHE_ADDR")
                .or_else(|| lookup("REDIS_URL"))
                .unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),

            default_ttl: lookup("CACHE_DEFAULT_TTL_SECS")
                .and_then(|v| v.parse().ok())
                .map_or(Duration::ZERO, Duration::from_secs),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }
}

/// Turn a bare `host:port` address into a connection URL.
pub fn connection_url(address: &str) -> String {
    if address.contains("://") {
        address.to_string()
    } else {
        format!("redis://{address}")
    }
}
