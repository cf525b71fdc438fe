//! # In-Memory Store
//!
//! Process-local [`Cacher`] backed by a `HashMap`. Expired entries are
//! treated as absent and purged lazily when their key is next read.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::{CacheError, Result};
use crate::store::Cacher;

#[derive(Debug, Clone)]
struct Entry {
    bytes: Vec<u8>,
    /// None = no expiration
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// In-memory cache store
#[derive(Debug, Default)]
pub struct MemoryCacher {
    entries: RwLock<HashMap<String, Entry>>,
    closed: AtomicBool,
}

impl MemoryCacher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether [`Cacher::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(CacheError::Connection("client is closed".to_string()))
        } else {
            Ok(())
        }
    }

    /// None when the ttl is zero or too large to represent; both never expire.
    fn deadline(ttl: Duration) -> Option<Instant> {
        if ttl.is_zero() {
            None
        } else {
            Instant::now().checked_add(ttl)
        }
    }
}

#[async_trait]
impl Cacher for MemoryCacher {
    async fn ping(&self) -> Result<()> {
        self.ensure_open()
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(CacheError::Connection("client is closed".to_string()));
        }
        self.entries.write().await.clear();
        Ok(())
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        self.ensure_open()?;
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(Instant::now()) => return Ok(entry.bytes.clone()),
                None => return Err(CacheError::not_found(key)),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.is_expired(Instant::now())) {
            entries.remove(key);
            tracing::debug!(key, "Purged expired entry");
        }
        Err(CacheError::not_found(key))
    }

    async fn remove_object(&self, key: &str) -> Result<()> {
        self.ensure_open()?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn create_object(&self, key: &str, bytes: &[u8], ttl: Duration) -> Result<()> {
        self.ensure_open()?;
        self.entries.write().await.insert(
            key.to_string(),
            Entry {
                bytes: bytes.to_vec(),
                expires_at: Self::deadline(ttl),
            },
        );
        Ok(())
    }

    async fn set_expiration(&self, key: &str, ttl: Duration) -> Result<()> {
        self.ensure_open()?;
        let mut entries = self.entries.write().await;

        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired(Instant::now()) => {
                // a zero ttl expires the key immediately, as EXPIREAT(now) does;
                // an unrepresentable deadline never expires
                entry.expires_at = Instant::now().checked_add(ttl);
                Ok(())
            }
            _ => Err(CacheError::not_found(key)),
        }
    }
}
