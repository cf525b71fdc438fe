//! # Shared Instance
//!
//! One-time initialization slot for a client shared by every caller that
//! asks for it. The first caller builds the client; concurrent callers wait
//! on the slot lock and receive the same instance. The owner tears it down
//! explicitly with [`SharedInstance::reset`].

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::Result;

struct Bound<C> {
    address: String,
    client: Arc<C>,
}

/// Lazily-initialized shared client
pub struct SharedInstance<C> {
    slot: Mutex<Option<Bound<C>>>,
}

impl<C> SharedInstance<C> {
    /// Empty slot; usable in a `static`
    pub const fn new() -> Self {
        Self {
            slot: Mutex::const_new(None),
        }
    }

    /// Return the shared client, building it with `init` on first use
    ///
    /// Later calls return the existing client whatever `address` they pass.
    /// A failed `init` leaves the slot empty so the next caller retries.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `init`.
    pub async fn get_or_try_init<F, Fut>(&self, address: &str, init: F) -> Result<Arc<C>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<C>>,
    {
        self.get_live_or_try_init(address, |_| true, init).await
    }

    /// Like [`get_or_try_init`](Self::get_or_try_init), but a bound client
    /// for which `is_live` returns false is dropped and rebuilt with `init`.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `init`.
    pub async fn get_live_or_try_init<L, F, Fut>(
        &self,
        address: &str,
        is_live: L,
        init: F,
    ) -> Result<Arc<C>>
    where
        L: Fn(&C) -> bool,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<C>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(stale) = slot.take_if(|bound| !is_live(&bound.client)) {
            tracing::info!(address = %stale.address, "Replacing closed shared client");
        }

        if let Some(bound) = slot.as_ref() {
            if bound.address != address {
                tracing::warn!(
                    requested = address,
                    bound = %bound.address,
                    "Shared client already bound to another address"
                );
            }
            return Ok(Arc::clone(&bound.client));
        }

        let client = Arc::new(init(address.to_string()).await?);
        *slot = Some(Bound {
            address: address.to_string(),
            client: Arc::clone(&client),
        });
        tracing::info!(address, "Shared client initialized");

        Ok(client)
    }

    /// The shared client, if initialized
    pub async fn get(&self) -> Option<Arc<C>> {
        self.slot
            .lock()
            .await
            .as_ref()
            .map(|bound| Arc::clone(&bound.client))
    }

    /// Empty the slot and hand the previous client back to the owner
    ///
    /// The next [`get_or_try_init`](Self::get_or_try_init) builds a new client.
    pub async fn reset(&self) -> Option<Arc<C>> {
        let previous = self.slot.lock().await.take();
        if let Some(bound) = &previous {
            tracing::info!(address = %bound.address, "Shared client released");
        }
        previous.map(|bound| bound.client)
    }
}

impl<C> Default for SharedInstance<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::memory::MemoryCacher;
    use crate::store::{Cacher, CacherExt};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_calls_initialize_once() {
        let shared = Arc::new(SharedInstance::<MemoryCacher>::new());
        let inits = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let shared = Arc::clone(&shared);
                let inits = Arc::clone(&inits);
                tokio::spawn(async move {
                    shared
                        .get_or_try_init("localhost:6379", |_| async move {
                            inits.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok(MemoryCacher::new())
                        })
                        .await
                })
            })
            .collect();

        let mut clients = Vec::new();
        for handle in handles {
            clients.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(inits.load(Ordering::SeqCst), 1);
        assert!(clients.iter().all(|c| Arc::ptr_eq(c, &clients[0])));
    }

    #[tokio::test]
    async fn test_later_address_is_ignored() {
        let shared = SharedInstance::<MemoryCacher>::new();

        let first = shared
            .get_or_try_init("a:1", |_| async { Ok(MemoryCacher::new()) })
            .await
            .unwrap();
        first.create_object("k", b"v", Duration::ZERO).await.unwrap();

        let second = shared
            .get_or_try_init("b:2", |_| async { Ok(MemoryCacher::new()) })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.get_string("k").await.unwrap(), "v");
    }

    #[tokio::test]
    async fn test_failed_init_leaves_slot_empty() {
        let shared = SharedInstance::<MemoryCacher>::new();

        let err = shared
            .get_or_try_init("down:1", |addr| async move {
                Err(CacheError::Connection(format!("refused: {addr}")))
            })
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("down:1"));
        assert!(shared.get().await.is_none());

        let client = shared
            .get_or_try_init("up:1", |_| async { Ok(MemoryCacher::new()) })
            .await;
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_closed_client_is_rebuilt() {
        let shared = SharedInstance::<MemoryCacher>::new();
        let inits = AtomicUsize::new(0);
        let build = |_: String| {
            inits.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, CacheError>(MemoryCacher::new()) }
        };

        let first = shared
            .get_live_or_try_init("a:1", |c| !c.is_closed(), build)
            .await
            .unwrap();
        first.close().await.unwrap();

        let second = shared
            .get_live_or_try_init("a:1", |c| !c.is_closed(), build)
            .await
            .unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.ping().await.is_ok());
        assert_eq!(inits.load(Ordering::SeqCst), 2);

        let third = shared
            .get_live_or_try_init("a:1", |c| !c.is_closed(), build)
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&second, &third));
        assert_eq!(inits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reset_allows_fresh_instance() {
        let shared = SharedInstance::<MemoryCacher>::new();
        let first = shared
            .get_or_try_init("a:1", |_| async { Ok(MemoryCacher::new()) })
            .await
            .unwrap();

        let released = shared.reset().await.unwrap();
        assert!(Arc::ptr_eq(&first, &released));
        released.close().await.unwrap();
        assert!(shared.get().await.is_none());

        let second = shared
            .get_or_try_init("a:1", |_| async { Ok(MemoryCacher::new()) })
            .await
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.ping().await.is_ok());
    }
}
