//! The trie node cache interface and its closed set of backends

use crate::hybrid::HybridCache;
use crate::local::LocalCache;
use crate::remote::RemoteCache;
use crate::types::{CacheStats, TrieNodeCacheType};
use async_trait::async_trait;

/// Cache of serialized trie nodes keyed by content hash.
///
/// No method reports an error: a backend that cannot serve a request
/// behaves as if the key were not cached, and a write it cannot perform is
/// dropped. Callers treat `None` as "fall through to the trie database".
#[async_trait]
pub trait NodeCache: Send + Sync {
    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &[u8], value: &[u8]);

    /// Cached value for `key`, if any
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Existence check and retrieval in a single lookup.
    ///
    /// `Some(value)` means present (an empty value is still present),
    /// `None` means absent. Remote backends answer with one round trip.
    async fn has(&self, key: &[u8]) -> Option<Vec<u8>>;
}

/// A constructed trie node cache
pub enum TrieNodeCache {
    Local(LocalCache),
    Remote(RemoteCache),
    Hybrid(HybridCache),
}

impl TrieNodeCache {
    pub fn cache_type(&self) -> TrieNodeCacheType {
        match self {
            TrieNodeCache::Local(_) => TrieNodeCacheType::LocalCache,
            TrieNodeCache::Remote(_) => TrieNodeCacheType::RemoteCache,
            TrieNodeCache::Hybrid(_) => TrieNodeCacheType::HybridCache,
        }
    }

    pub fn stats(&self) -> CacheStats {
        match self {
            TrieNodeCache::Local(cache) => cache.stats(),
            TrieNodeCache::Remote(cache) => cache.stats(),
            TrieNodeCache::Hybrid(cache) => cache.stats(),
        }
    }
}

#[async_trait]
impl NodeCache for TrieNodeCache {
    async fn set(&self, key: &[u8], value: &[u8]) {
        match self {
            TrieNodeCache::Local(cache) => cache.set(key, value).await,
            TrieNodeCache::Remote(cache) => cache.set(key, value).await,
            TrieNodeCache::Hybrid(cache) => cache.set(key, value).await,
        }
    }

    async fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self {
            TrieNodeCache::Local(cache) => cache.get(key).await,
            TrieNodeCache::Remote(cache) => cache.get(key).await,
            TrieNodeCache::Hybrid(cache) => cache.get(key).await,
        }
    }

    async fn has(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self {
            TrieNodeCache::Local(cache) => cache.has(key).await,
            TrieNodeCache::Remote(cache) => cache.has(key).await,
            TrieNodeCache::Hybrid(cache) => cache.has(key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteOptions;
    use crate::testing::MemoryStore;
    use std::sync::Arc;

    async fn roundtrip(cache: &dyn NodeCache) {
        cache.set(b"hash", b"node").await;
        assert_eq!(cache.get(b"hash").await, Some(b"node".to_vec()));
        assert_eq!(cache.has(b"hash").await, Some(b"node".to_vec()));
        assert!(cache.has(b"other").await.is_none());
    }

    #[tokio::test]
    async fn test_every_backend_honours_the_interface() {
        let local = TrieNodeCache::Local(LocalCache::new(1).unwrap());
        roundtrip(&local).await;
        assert_eq!(local.cache_type(), TrieNodeCacheType::LocalCache);

        let store = Arc::new(MemoryStore::new());
        let remote = TrieNodeCache::Remote(
            RemoteCache::with_store(store.clone(), RemoteOptions::default()).unwrap(),
        );
        roundtrip(&remote).await;
        assert_eq!(remote.cache_type(), TrieNodeCacheType::RemoteCache);

        let hybrid = TrieNodeCache::Hybrid(HybridCache::from_tiers(
            LocalCache::new(1).unwrap(),
            RemoteCache::with_store(Arc::new(MemoryStore::new()), RemoteOptions::default())
                .unwrap(),
        ));
        roundtrip(&hybrid).await;
        assert_eq!(hybrid.cache_type(), TrieNodeCacheType::HybridCache);
    }

    #[tokio::test]
    async fn test_stats_dispatch() {
        let cache = TrieNodeCache::Local(LocalCache::new(1).unwrap());
        cache.get(b"missing").await;
        assert_eq!(cache.stats().local_misses, 1);
    }
}
