//! # Cache Connector Library
//!
//! Thin client layer over a key-value cache store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Application Layer                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  CacherExt (decode callbacks)                │
//! │           get_object / get_string / get_json / set_json      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Cacher capability                        │
//! │  ping / close / fetch / remove / create / set_expiration     │
//! └─────────────────────────────────────────────────────────────┘
//!                    │                   │
//!                    ▼                   ▼
//! ┌─────────────────────────┐   ┌──────────────────────────────┐
//! │      RedisCacher        │   │        MemoryCacher          │
//! │  (shared or owned)      │   │   (in-process, tests)        │
//! └─────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - `redis`: Enable the Redis backend (default)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cache_connector::{Cacher, CacherExt, RedisCacher};
//! use std::time::Duration;
//!
//! // Owned client, one per caller
//! let cache = RedisCacher::connect("127.0.0.1:6379").await?;
//!
//! // Or the process-wide shared client
//! let shared = RedisCacher::shared("127.0.0.1:6379").await?;
//!
//! cache.create_object("session:42", b"alice", Duration::from_secs(60)).await?;
//! let user = cache.get_string("session:42").await?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod shared;
pub mod store;

// Re-export commonly used types
pub use config::CacheConfig;
pub use error::{BoxError, CacheError, Result};
pub use memory::MemoryCacher;
#[cfg(feature = "redis")]
pub use redis_store::RedisCacher;
pub use shared::SharedInstance;
pub use store::{Cacher, CacherExt};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Connect an owned Redis client using environment configuration
///
/// # Errors
///
/// Returns an error if the Redis connection fails.
#[cfg(feature = "redis")]
pub async fn connect_from_env() -> Result<RedisCacher> {
    RedisCacher::from_config(&CacheConfig::from_env()).await
}
