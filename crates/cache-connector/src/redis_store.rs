//! # Redis Store
//!
//! Redis-backed [`Cacher`] over a multiplexed async connection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::{CacheConfig, connection_url};
use crate::error::{CacheError, Result};
use crate::shared::SharedInstance;
use crate::store::Cacher;

static SHARED: SharedInstance<RedisCacher> = SharedInstance::new();

/// Redis cache client
///
/// The connection handle is safe to use from many tasks at once; `close`
/// drops it and every later operation fails with a connection error.
pub struct RedisCacher {
    conn: RwLock<Option<MultiplexedConnection>>,
    closed: AtomicBool,
    address: String,
}

impl RedisCacher {
    /// Connect a new, independently owned client to `address`
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] if the address is invalid or the
    /// store cannot be reached.
    pub async fn connect(address: &str) -> Result<Self> {
        let client = Client::open(connection_url(address).as_str())?;
        let conn = client.get_multiplexed_async_connection().await?;
        tracing::info!(address, "Connected to cache store");

        Ok(Self {
            conn: RwLock::new(Some(conn)),
            closed: AtomicBool::new(false),
            address: address.to_string(),
        })
    }

    /// Connect a new client using `config`
    ///
    /// # Errors
    ///
    /// Same as [`RedisCacher::connect`].
    pub async fn from_config(config: &CacheConfig) -> Result<Self> {
        Self::connect(&config.address).await
    }

    /// Process-wide shared client
    ///
    /// The first call connects to `address`; every later call returns that
    /// same client until [`RedisCacher::close_shared`] tears it down. If a
    /// holder closed the shared client directly, the next call reconnects.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] if a connection attempt fails.
    pub async fn shared(address: &str) -> Result<Arc<Self>> {
        SHARED
            .get_live_or_try_init(
                address,
                |client| !client.is_closed(),
                |addr| async move { Self::connect(&addr).await },
            )
            .await
    }

    /// Release the process-wide shared client, closing its connection
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] if the client was already closed.
    pub async fn close_shared() -> Result<()> {
        match SHARED.reset().await {
            Some(client) => client.close().await,
            None => Ok(()),
        }
    }

    /// Whether [`Cacher::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Address this client was built with
    pub fn address(&self) -> &str {
        &self.address
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        self.conn
            .read()
            .await
            .clone()
            .ok_or_else(|| CacheError::Connection("client is closed".to_string()))
    }
}

impl std::fmt::Debug for RedisCacher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacher")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Expiry option for `SET`: seconds when the ttl is whole, milliseconds otherwise.
fn expiry_option(ttl: Duration) -> Option<(&'static str, u64)> {
    if ttl.is_zero() {
        return None;
    }

    if ttl < Duration::from_secs(1) || ttl.subsec_nanos() != 0 {
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        Some(("PX", millis))
    } else {
        Some(("EX", ttl.as_secs()))
    }
}

/// Absolute unix deadline in milliseconds, `ttl` after `now`.
fn deadline_millis(now: DateTime<Utc>, ttl: Duration) -> i64 {
    let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now.timestamp_millis().saturating_add(ttl_millis)
}

#[async_trait]
impl Cacher for RedisCacher {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        tracing::debug!(reply = %pong, "Ping");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        match self.conn.write().await.take() {
            Some(_) => {
                self.closed.store(true, Ordering::Release);
                tracing::info!(address = %self.address, "Cache connection closed");
                Ok(())
            }
            None => Err(CacheError::Connection("client is closed".to_string())),
        }
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = conn.get(key).await?;

        tracing::debug!(key, hit = value.is_some(), "Fetch");
        value.ok_or_else(|| CacheError::not_found(key))
    }

    async fn remove_object(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let deleted: i64 = conn.del(key).await?;

        tracing::debug!(key, deleted, "Remove");
        Ok(())
    }

    async fn create_object(&self, key: &str, bytes: &[u8], ttl: Duration) -> Result<()> {
        let mut conn = self.connection().await?;

        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(bytes);
        if let Some((unit, amount)) = expiry_option(ttl) {
            cmd.arg(unit).arg(amount);
        }
        let _: () = cmd.query_async(&mut conn).await?;

        tracing::debug!(key, ttl = ?ttl, size = bytes.len(), "Create");
        Ok(())
    }

    async fn set_expiration(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.connection().await?;
        let deadline = deadline_millis(Utc::now(), ttl);

        let updated: bool = redis::cmd("PEXPIREAT")
            .arg(key)
            .arg(deadline)
            .query_async(&mut conn)
            .await?;

        tracing::debug!(key, deadline, updated, "Set expiration");
        if updated {
            Ok(())
        } else {
            Err(CacheError::not_found(key))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_expiry_option() {
        assert_eq!(expiry_option(Duration::ZERO), None);
        assert_eq!(expiry_option(Duration::from_secs(60)), Some(("EX", 60)));
        assert_eq!(expiry_option(Duration::from_millis(1500)), Some(("PX", 1500)));
        assert_eq!(expiry_option(Duration::from_millis(250)), Some(("PX", 250)));
        assert_eq!(expiry_option(Duration::from_micros(10)), Some(("PX", 1)));
    }

    #[test]
    fn test_deadline_millis() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        assert_eq!(deadline_millis(now, Duration::from_secs(60)), 1_700_000_060_000);
        assert_eq!(deadline_millis(now, Duration::ZERO), 1_700_000_000_000);
        assert_eq!(deadline_millis(now, Duration::MAX), i64::MAX);
    }

    #[tokio::test]
    async fn test_invalid_address_is_connection_error() {
        let err = RedisCacher::connect("redis://[not-an-address").await.unwrap_err();
        assert!(matches!(err, CacheError::Connection(_)));
    }

    #[tokio::test]
    async fn test_close_shared_without_instance() {
        assert!(RedisCacher::close_shared().await.is_ok());
    }
}
