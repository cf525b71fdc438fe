//! # Store Capability
//!
//! Abstract cache store interface. Implementations can be swapped for
//! different backends (Redis, in-memory, etc.) without touching callers.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;

use crate::error::{BoxError, CacheError, Result};

/// Capability set of a key-value cache store
#[async_trait]
pub trait Cacher: Send + Sync {
    /// Check that the store is reachable
    async fn ping(&self) -> Result<()>;

    /// Release the connection; later operations fail with a connection error
    async fn close(&self) -> Result<()>;

    /// Fetch the raw bytes stored under `key`
    ///
    /// Fails with [`CacheError::NotFound`] when the key is absent or expired.
    async fn fetch(&self, key: &str) -> Result<Vec<u8>>;

    /// Delete `key`; deleting an absent key is not an error
    async fn remove_object(&self, key: &str) -> Result<()>;

    /// Store `bytes` under `key`, overwriting any previous value
    ///
    /// The value expires `ttl` from now; a zero `ttl` means no expiration.
    async fn create_object(&self, key: &str, bytes: &[u8], ttl: Duration) -> Result<()>;

    /// Set the expiration of `key` to the absolute deadline `now + ttl`
    ///
    /// Fails with [`CacheError::NotFound`] when the key does not exist.
    async fn set_expiration(&self, key: &str, ttl: Duration) -> Result<()>;
}

/// Decoding operations layered over any [`Cacher`]
///
/// The cache never interprets stored bytes itself: every read goes through
/// a caller-supplied decode function.
#[async_trait]
pub trait CacherExt: Cacher {
    /// Fetch `key` and hand the raw bytes to `decode`
    ///
    /// `decode` runs at most once, and only when bytes were retrieved. Its
    /// failure is wrapped in [`CacheError::Decode`].
    async fn get_object<T, E, F>(&self, key: &str, decode: F) -> Result<T>
    where
        T: Send,
        E: Into<BoxError>,
        F: FnOnce(&[u8]) -> std::result::Result<T, E> + Send,
    {
        let bytes = self.fetch(key).await?;

        decode(&bytes).map_err(|e| {
            tracing::debug!(key, "Decode function rejected cached value");
            CacheError::Decode {
                key: key.to_string(),
                source: e.into(),
            }
        })
    }

    /// Fetch `key` as UTF-8 text
    async fn get_string(&self, key: &str) -> Result<String> {
        self.get_object(key, |bytes| std::str::from_utf8(bytes).map(str::to_owned))
            .await
    }

    /// Fetch `key` as a JSON document
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> Result<T> {
        self.get_object(key, |bytes| serde_json::from_slice::<T>(bytes))
            .await
    }

    /// Store `value` as a JSON document with TTL
    async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let bytes = serde_json::to_vec(value).map_err(|e| CacheError::Encode {
            key: key.to_string(),
            source: e.into(),
        })?;
        self.create_object(key, &bytes, ttl).await
    }
}

impl<C: Cacher + ?Sized> CacherExt for C {}
