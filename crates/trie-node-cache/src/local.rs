//! In-process trie node cache with byte-weighted LRU eviction

use crate::cache::NodeCache;
use crate::types::CacheStats;
use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Bounded in-memory cache keyed by node hash.
///
/// Entries are weighed by `key.len() + value.len()` and the total weight is
/// held under the configured byte budget. Eviction is amortized by moka's
/// maintenance tasks, so the resident total may briefly exceed the budget
/// between an insert and the next maintenance run.
#[derive(Clone)]
pub struct LocalCache {
    entries: Cache<Vec<u8>, Vec<u8>>,
    max_bytes: u64,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl LocalCache {
    /// Create a cache with a budget in megabytes. A zero budget means no
    /// cache at all.
    pub fn new(size_mb: u64) -> Option<Self> {
        if size_mb == 0 {
            return None;
        }
        Some(Self::with_max_bytes(size_mb.saturating_mul(BYTES_PER_MB)))
    }

    /// Create a cache with an exact byte budget
    pub fn with_max_bytes(max_bytes: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_bytes)
            .weigher(|key: &Vec<u8>, value: &Vec<u8>| -> u32 {
                u32::try_from(key.len() + value.len()).unwrap_or(u32::MAX)
            })
            .eviction_policy(EvictionPolicy::lru())
            .build();

        debug!(max_bytes, "Local trie node cache created");

        Self {
            entries,
            max_bytes,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn set(&self, key: &[u8], value: &[u8]) {
        self.entries.insert(key.to_vec(), value.to_vec()).await;
    }

    pub async fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let found = self.entries.get(key).await;
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Existence check that also hands back the payload
    pub async fn has(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.get(key).await
    }

    /// Configured byte budget
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Bytes currently accounted to resident entries
    pub fn weighted_size(&self) -> u64 {
        self.entries.weighted_size()
    }

    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Run pending eviction bookkeeping so the size counters are current
    pub async fn sync(&self) {
        self.entries.run_pending_tasks().await;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            local_hits: self.hits.load(Ordering::Relaxed),
            local_misses: self.misses.load(Ordering::Relaxed),
            entries: self.entry_count(),
            resident_bytes: self.weighted_size(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl NodeCache for LocalCache {
    async fn set(&self, key: &[u8], value: &[u8]) {
        LocalCache::set(self, key, value).await
    }

    async fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        LocalCache::get(self, key).await
    }

    async fn has(&self, key: &[u8]) -> Option<Vec<u8>> {
        LocalCache::has(self, key).await
    }
}
