// Path: crates/node/src/prover/pool.rs
//! Bounded lazy pool of keep-alive channels to a proving backend.
//!
//! Channels are created on demand up to the cap; `acquire` waits when every
//! channel is out. One pool exists per `(address, cap)` process-wide, so
//! every pipeline instance shares the same channels.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use provenet_types::error::ProveError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tonic::transport::{Channel, Endpoint};

/// Default channel cap per backend address.
pub const DEFAULT_MAX_CONNECTIONS: usize = 100;
/// HTTP/2 keep-alive ping interval.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(60);
/// How long a keep-alive ping may go unanswered.
const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(20);
/// Per-request deadline applied at the channel.
pub const BACKEND_DEADLINE: Duration = Duration::from_secs(30);

static POOLS: Lazy<DashMap<(String, usize), Arc<ChannelPool>>> = Lazy::new(DashMap::new);

/// A channel checked out of a pool. Hand it back with
/// [`ChannelPool::release`]; dropping it without releasing frees the slot
/// but discards the channel.
pub struct PooledChannel {
    channel: Channel,
    _permit: OwnedSemaphorePermit,
}

impl PooledChannel {
    /// A clone of the underlying channel for building a client.
    pub fn channel(&self) -> Channel {
        self.channel.clone()
    }
}

/// Bounded lazy pool of channels to one backend address.
pub struct ChannelPool {
    address: String,
    max_connections: usize,
    semaphore: Arc<Semaphore>,
    idle: Mutex<Vec<Channel>>,
    closed: AtomicBool,
}

impl ChannelPool {
    /// A pool for `address` capped at `max_connections`.
    pub fn new(address: impl Into<String>, max_connections: usize) -> Self {
        Self {
            address: address.into(),
            max_connections,
            semaphore: Arc::new(Semaphore::new(max_connections)),
            idle: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// The process-wide pool for `(address, cap)`.
    pub fn for_address(address: &str, max_connections: usize) -> Arc<Self> {
        POOLS
            .entry((address.to_string(), max_connections))
            .or_insert_with(|| Arc::new(Self::new(address, max_connections)))
            .clone()
    }

    fn make_channel(&self) -> Result<Channel, ProveError> {
        let endpoint = Endpoint::from_shared(self.address.clone())
            .map_err(|e| ProveError::BackendUnavailable(format!("{}: {e}", self.address)))?
            .http2_keep_alive_interval(KEEPALIVE_INTERVAL)
            .keep_alive_timeout(KEEPALIVE_TIMEOUT)
            .keep_alive_while_idle(true)
            .connect_timeout(Duration::from_secs(5))
            .timeout(BACKEND_DEADLINE);
        Ok(endpoint.connect_lazy())
    }

    /// Check a channel out, waiting if every slot is taken.
    pub async fn acquire(&self) -> Result<PooledChannel, ProveError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ProveError::BackendUnavailable(format!(
                "{}: pool closed",
                self.address
            )));
        }
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| {
                ProveError::BackendUnavailable(format!("{}: pool closed", self.address))
            })?;
        let channel = match self.idle.lock().pop() {
            Some(channel) => channel,
            None => self.make_channel()?,
        };
        Ok(PooledChannel {
            channel,
            _permit: permit,
        })
    }

    /// Return a channel to the pool. After `close`, the channel is dropped
    /// instead.
    pub fn release(&self, pooled: PooledChannel) {
        if !self.closed.load(Ordering::Acquire) {
            self.idle.lock().push(pooled.channel);
        }
        // The permit frees with `pooled`.
    }

    /// Pre-create up to `n` idle channels (bounded by the cap). Returns how
    /// many the pool now holds idle.
    pub fn warmup(&self, n: usize) -> Result<usize, ProveError> {
        let target = n.min(self.max_connections);
        let mut idle = self.idle.lock();
        while idle.len() < target {
            let channel = self.make_channel()?;
            idle.push(channel);
        }
        Ok(idle.len())
    }

    /// Close the pool: pending and future `acquire`s fail, idle channels
    /// are dropped, in-flight channels are dropped at release.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.semaphore.close();
        self.idle.lock().clear();
        tracing::info!(target: "pool", address = %self.address, "channel pool closed");
    }

    #[cfg(test)]
    fn idle_len(&self) -> usize {
        self.idle.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "http://127.0.0.1:60051";

    #[tokio::test]
    async fn acquire_waits_at_the_cap_and_release_unblocks() {
        let pool = Arc::new(ChannelPool::new(ADDR, 2));
        let first = pool.acquire().await.unwrap();
        let _second = pool.acquire().await.unwrap();

        let blocked =
            tokio::time::timeout(Duration::from_millis(100), pool.acquire()).await;
        assert!(blocked.is_err(), "third acquire must wait at the cap");

        pool.release(first);
        let third = tokio::time::timeout(Duration::from_millis(100), pool.acquire())
            .await
            .expect("released slot should unblock acquire")
            .unwrap();
        pool.release(third);
    }

    #[tokio::test]
    async fn released_channels_are_reused() {
        let pool = ChannelPool::new(ADDR, 4);
        let pooled = pool.acquire().await.unwrap();
        pool.release(pooled);
        assert_eq!(pool.idle_len(), 1);
        let _again = pool.acquire().await.unwrap();
        assert_eq!(pool.idle_len(), 0);
    }

    #[tokio::test]
    async fn warmup_is_bounded_by_the_cap() {
        let pool = ChannelPool::new(ADDR, 3);
        assert_eq!(pool.warmup(10).unwrap(), 3);
    }

    #[tokio::test]
    async fn closed_pool_rejects_and_drops() {
        let pool = ChannelPool::new(ADDR, 2);
        let held = pool.acquire().await.unwrap();
        pool.close();
        assert!(pool.acquire().await.is_err());
        pool.release(held);
        assert_eq!(pool.idle_len(), 0);
    }

    #[tokio::test]
    async fn pools_are_singletons_per_address_and_cap() {
        let a = ChannelPool::for_address("http://127.0.0.1:60052", 8);
        let b = ChannelPool::for_address("http://127.0.0.1:60052", 8);
        let c = ChannelPool::for_address("http://127.0.0.1:60052", 9);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
