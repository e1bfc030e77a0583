//! Pooled browsing contexts with global request spacing
//!
//! The pool hands out one of N contexts. Acquisition waits for a free slot
//! and then until at least `request-delay` has passed since the last
//! dispatch by *any* slot. Releasing a slot (explicitly or by dropping it)
//! returns the context without touching the shared timestamp.

use crate::config::EngineConfig;
use std::ops::Deref;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Returned once [`ResourcePool::close`] has been called
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("resource pool is closed")]
pub struct PoolClosed;

/// An isolated session the page source loads pages in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowsingContext {
    pub id: usize,
}

/// Fixed-size pool of resources with a shared dispatch clock
pub struct ResourcePool<T = BrowsingContext> {
    semaphore: Arc<Semaphore>,
    idle: Arc<StdMutex<Vec<T>>>,
    last_dispatch: Mutex<Option<Instant>>,
    delay: Duration,
    size: usize,
}

impl ResourcePool<BrowsingContext> {
    /// Creates `count` browsing contexts spaced by `delay`
    pub fn with_contexts(count: usize, delay: Duration) -> Self {
        Self::new((0..count).map(|id| BrowsingContext { id }).collect(), delay)
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::with_contexts(
            config.max_concurrent,
            Duration::from_millis(config.request_delay),
        )
    }
}

impl<T> ResourcePool<T> {
    pub fn new(resources: Vec<T>, delay: Duration) -> Self {
        let size = resources.len();
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            idle: Arc::new(StdMutex::new(resources)),
            last_dispatch: Mutex::new(None),
            delay,
            size,
        }
    }

    /// Waits for a free slot and for the dispatch delay to elapse
    ///
    /// The dispatch clock is held while waiting, so concurrent callers are
    /// released one `delay` apart in the order they reached it.
    pub async fn acquire(&self) -> Result<Slot<T>, PoolClosed> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolClosed)?;

        {
            let mut last = self.last_dispatch.lock().await;
            if let Some(previous) = *last {
                let ready_at = previous + self.delay;
                if ready_at > Instant::now() {
                    tokio::time::sleep_until(ready_at).await;
                }
            }
            if self.semaphore.is_closed() {
                return Err(PoolClosed);
            }
            *last = Some(Instant::now());
        }

        let resource = self
            .idle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop()
            .ok_or(PoolClosed)?;

        Ok(Slot {
            resource: Some(resource),
            idle: Arc::clone(&self.idle),
            _permit: permit,
        })
    }

    /// Returns a slot to the pool
    pub fn release(&self, slot: Slot<T>) {
        drop(slot);
    }

    /// Stops further acquisitions; slots already out stay valid
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Number of free slots
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// A checked-out resource; goes back to the pool when dropped
pub struct Slot<T> {
    resource: Option<T>,
    idle: Arc<StdMutex<Vec<T>>>,
    _permit: OwnedSemaphorePermit,
}

impl<T> Slot<T> {
    pub fn resource(&self) -> &T {
        self
    }
}

impl<T> Deref for Slot<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.resource {
            Some(resource) => resource,
            None => unreachable!("slot resource is only taken on drop"),
        }
    }
}

impl<T> Drop for Slot<T> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            self.idle
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(resource);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sequential_acquires_are_spaced() {
        let delay = Duration::from_millis(40);
        let pool = ResourcePool::with_contexts(2, delay);

        let start = std::time::Instant::now();
        for _ in 0..4 {
            let slot = pool.acquire().await.unwrap();
            pool.release(slot);
        }

        assert!(start.elapsed() >= delay * 3);
    }

    #[tokio::test]
    async fn test_first_acquire_is_immediate() {
        let pool = ResourcePool::with_contexts(1, Duration::from_secs(60));

        let start = std::time::Instant::now();
        let _slot = pool.acquire().await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_drop_returns_slot() {
        let pool = ResourcePool::with_contexts(2, Duration::ZERO);
        assert_eq!(pool.available(), 2);

        let first = pool.acquire().await.unwrap();
        let second = pool.acquire().await.unwrap();
        assert_eq!(pool.available(), 0);
        assert_ne!(first.id, second.id);

        drop(first);
        assert_eq!(pool.available(), 1);
        pool.release(second);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_waits_for_free_slot() {
        let pool = Arc::new(ResourcePool::with_contexts(1, Duration::ZERO));
        let held = pool.acquire().await.unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.acquire().await.map(|slot| slot.id) })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(held);
        assert_eq!(waiter.await.unwrap(), Ok(0));
    }

    #[tokio::test]
    async fn test_close_rejects_acquire() {
        let pool = ResourcePool::with_contexts(2, Duration::ZERO);
        let slot = pool.acquire().await.unwrap();

        pool.close();
        assert!(pool.is_closed());
        assert!(matches!(pool.acquire().await, Err(PoolClosed)));

        // Outstanding slots can still be returned
        drop(slot);
    }
}
