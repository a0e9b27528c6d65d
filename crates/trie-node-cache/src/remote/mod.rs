//! Best-effort trie node cache backed by a shared Redis store

mod endpoint;
mod store;

pub(crate) use endpoint::redact as redact_endpoint;
pub(crate) use store::RemoteStore;

use crate::cache::NodeCache;
use crate::error::{CacheError, RemoteError, Result};
use crate::types::CacheStats;
use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use store::RedisStore;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Tuning for the remote tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteOptions {
    /// Deadline applied to every request
    pub timeout: Duration,
    /// How long to bypass the store after it was found unreachable
    pub retry_backoff: Duration,
    /// Capacity of the queue behind [`RemoteCache::set_async`]
    pub write_queue_size: usize,
}

impl Default for RemoteOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
            retry_backoff: Duration::from_secs(1),
            write_queue_size: 10_000,
        }
    }
}

/// Largest number of queued writes sent to the store in one request
const WRITE_BATCH: usize = 128;

type PendingWrite = (Vec<u8>, Vec<u8>);

/// Shared state between the cache handle and its background writer
struct Remote {
    store: Arc<dyn RemoteStore>,
    timeout: Duration,
    retry_backoff: Duration,
    epoch: Instant,
    /// Milliseconds after `epoch` until which the store is bypassed
    down_until_ms: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    dropped_writes: AtomicU64,
}

impl Remote {
    fn is_down(&self) -> bool {
        let now_ms = self.epoch.elapsed().as_millis() as u64;
        now_ms < self.down_until_ms.load(Ordering::Relaxed)
    }

    /// Run one request under the deadline, folding every failure into `None`
    async fn call<T, F>(&self, op: &'static str, key: &[u8], request: F) -> Option<T>
    where
        F: Future<Output = std::result::Result<T, RemoteError>>,
    {
        if self.is_down() {
            return None;
        }

        let result = match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout(self.timeout)),
        };

        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                if err.is_connectivity() {
                    let until = self.epoch.elapsed() + self.retry_backoff;
                    self.down_until_ms
                        .store(until.as_millis() as u64, Ordering::Relaxed);
                    warn!(
                        op,
                        key = %hex::encode(key),
                        error = %err,
                        backoff_ms = self.retry_backoff.as_millis() as u64,
                        "Remote trie node cache unreachable, bypassing it"
                    );
                } else {
                    debug!(
                        op,
                        key = %hex::encode(key),
                        error = %err,
                        "Remote trie node cache request failed"
                    );
                }
                None
            }
        }
    }

    async fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let found = self.call("get", key, self.store.get(key)).await.flatten();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Writes that fail or are skipped while the store is bypassed count
    /// as dropped.
    async fn set(&self, key: &[u8], value: &[u8]) {
        if self.call("set", key, self.store.set(key, value)).await.is_none() {
            self.dropped_writes.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn set_many(&self, batch: &[PendingWrite]) {
        let Some((first, _)) = batch.first() else {
            return;
        };
        if self
            .call("set", first, self.store.set_many(batch))
            .await
            .is_none()
        {
            self.dropped_writes
                .fetch_add(batch.len() as u64, Ordering::Relaxed);
        }
    }
}

/// Trie node cache served by a Redis server or cluster.
///
/// Every request is bounded by [`RemoteOptions::timeout`]. Network and
/// protocol failures turn into misses (reads) or dropped writes, and a
/// connectivity failure makes the cache skip the store entirely for
/// [`RemoteOptions::retry_backoff`].
pub struct RemoteCache {
    remote: Arc<Remote>,
    writes: mpsc::Sender<PendingWrite>,
}

impl RemoteCache {
    /// Create a cache with default options
    pub fn new(endpoints: &[String], cluster: bool) -> Result<Self> {
        Self::with_options(endpoints, cluster, RemoteOptions::default())
    }

    /// Validate the endpoints and create a cache. No connection is opened
    /// until the first request.
    pub fn with_options(
        endpoints: &[String],
        cluster: bool,
        options: RemoteOptions,
    ) -> Result<Self> {
        let urls = endpoint::parse_endpoints(endpoints, cluster)?;
        let store = RedisStore::open(urls, cluster)?;
        Self::with_store(Arc::new(store), options)
    }

    pub(crate) fn with_store(store: Arc<dyn RemoteStore>, options: RemoteOptions) -> Result<Self> {
        let handle = Handle::try_current().map_err(|_| CacheError::NoRuntime)?;

        let remote = Arc::new(Remote {
            store,
            timeout: options.timeout,
            retry_backoff: options.retry_backoff,
            epoch: Instant::now(),
            down_until_ms: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            dropped_writes: AtomicU64::new(0),
        });

        let (writes, rx) = mpsc::channel(options.write_queue_size.max(1));
        handle.spawn(write_behind(remote.clone(), rx));

        Ok(Self { remote, writes })
    }

    /// Write synchronously, bounded by the request deadline
    pub async fn set(&self, key: &[u8], value: &[u8]) {
        self.remote.set(key, value).await;
    }

    /// Queue a write for the background writer, which sends queued writes
    /// to the store in batches. The write is dropped when the queue is full.
    pub fn set_async(&self, key: &[u8], value: &[u8]) {
        if self.writes.try_send((key.to_vec(), value.to_vec())).is_err() {
            self.remote.dropped_writes.fetch_add(1, Ordering::Relaxed);
            debug!(key = %hex::encode(key), "Remote write queue full, dropping write");
        }
    }

    pub async fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.remote.get(key).await
    }

    /// Same single GET round trip as [`RemoteCache::get`]
    pub async fn has(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.remote.get(key).await
    }

    /// Whether requests are currently being skipped after a connectivity failure
    pub fn is_degraded(&self) -> bool {
        self.remote.is_down()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            remote_hits: self.remote.hits.load(Ordering::Relaxed),
            remote_misses: self.remote.misses.load(Ordering::Relaxed),
            remote_errors: self.remote.errors.load(Ordering::Relaxed),
            dropped_writes: self.remote.dropped_writes.load(Ordering::Relaxed),
            ..Default::default()
        }
    }
}

/// Drain the write queue, sending whatever has accumulated as one batch
async fn write_behind(remote: Arc<Remote>, mut rx: mpsc::Receiver<PendingWrite>) {
    let mut batch = Vec::with_capacity(WRITE_BATCH);
    while rx.recv_many(&mut batch, WRITE_BATCH).await > 0 {
        remote.set_many(&batch).await;
        batch.clear();
    }
    debug!("Remote trie node cache writer stopped");
}

#[async_trait]
impl NodeCache for RemoteCache {
    async fn set(&self, key: &[u8], value: &[u8]) {
        RemoteCache::set(self, key, value).await
    }

    async fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        RemoteCache::get(self, key).await
    }

    async fn has(&self, key: &[u8]) -> Option<Vec<u8>> {
        RemoteCache::has(self, key).await
    }
}
