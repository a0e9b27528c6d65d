//! Local tier in front of a shared remote tier

use crate::cache::NodeCache;
use crate::error::{CacheError, Result};
use crate::local::LocalCache;
use crate::remote::RemoteCache;
use crate::types::{CacheStats, TrieNodeCacheConfig};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Two-tier trie node cache.
///
/// Writes go to both tiers, the remote one through the asynchronous write
/// queue. Reads try the local tier first and fall back to the remote tier;
/// a remote hit is copied into the local tier. Node values never change for
/// a given hash, so a promoted copy cannot go stale.
pub struct HybridCache {
    local: LocalCache,
    remote: RemoteCache,
    promotions: AtomicU64,
}

impl HybridCache {
    pub fn new(config: &TrieNodeCacheConfig) -> Result<Self> {
        let local =
            LocalCache::new(config.fast_cache_size_mb).ok_or(CacheError::HybridWithoutLocal)?;
        let remote = RemoteCache::with_options(
            &config.redis_endpoints,
            config.redis_cluster_enable,
            config.remote_options(),
        )?;
        Ok(Self::from_tiers(local, remote))
    }

    pub fn from_tiers(local: LocalCache, remote: RemoteCache) -> Self {
        Self {
            local,
            remote,
            promotions: AtomicU64::new(0),
        }
    }

    pub fn local(&self) -> &LocalCache {
        &self.local
    }

    pub fn remote(&self) -> &RemoteCache {
        &self.remote
    }

    pub async fn set(&self, key: &[u8], value: &[u8]) {
        self.local.set(key, value).await;
        self.remote.set_async(key, value);
    }

    pub async fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        if let Some(value) = self.local.get(key).await {
            return Some(value);
        }
        let value = self.remote.get(key).await?;
        self.promote(key, &value).await;
        Some(value)
    }

    pub async fn has(&self, key: &[u8]) -> Option<Vec<u8>> {
        if let Some(value) = self.local.has(key).await {
            return Some(value);
        }
        let value = self.remote.has(key).await?;
        self.promote(key, &value).await;
        Some(value)
    }

    async fn promote(&self, key: &[u8], value: &[u8]) {
        self.local.set(key, value).await;
        self.promotions.fetch_add(1, Ordering::Relaxed);
        trace!(key = %hex::encode(key), "Promoted remote trie node into local tier");
    }

    pub fn stats(&self) -> CacheStats {
        let local = self.local.stats();
        let remote = self.remote.stats();
        CacheStats {
            local_hits: local.local_hits,
            local_misses: local.local_misses,
            remote_hits: remote.remote_hits,
            remote_misses: remote.remote_misses,
            remote_errors: remote.remote_errors,
            dropped_writes: remote.dropped_writes,
            promotions: self.promotions.load(Ordering::Relaxed),
            entries: local.entries,
            resident_bytes: local.resident_bytes,
        }
    }
}

#[async_trait]
impl NodeCache for HybridCache {
    async fn set(&self, key: &[u8], value: &[u8]) {
        HybridCache::set(self, key, value).await
    }

    async fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        HybridCache::get(self, key).await
    }

    async fn has(&self, key: &[u8]) -> Option<Vec<u8>> {
        HybridCache::has(self, key).await
    }
}
