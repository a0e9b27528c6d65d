//! Construction of the configured trie node cache

use crate::cache::TrieNodeCache;
use crate::error::Result;
use crate::hybrid::HybridCache;
use crate::local::LocalCache;
use crate::remote::RemoteCache;
use crate::types::{TrieNodeCacheConfig, TrieNodeCacheType};
use tracing::info;

/// Result of a successful [`new_trie_node_cache`] call
pub enum CacheOutcome {
    Enabled(TrieNodeCache),
    /// Caching was turned off by configuration (a zero-sized local cache).
    /// The caller runs without any cache.
    Disabled,
}

impl CacheOutcome {
    pub fn is_disabled(&self) -> bool {
        matches!(self, CacheOutcome::Disabled)
    }

    pub fn into_cache(self) -> Option<TrieNodeCache> {
        match self {
            CacheOutcome::Enabled(cache) => Some(cache),
            CacheOutcome::Disabled => None,
        }
    }
}

/// Build the cache selected by `config.cache_type`.
///
/// The type name is matched case-insensitively. Remote and hybrid caches
/// must be built inside a tokio runtime.
pub fn new_trie_node_cache(config: &TrieNodeCacheConfig) -> Result<CacheOutcome> {
    let cache_type: TrieNodeCacheType = config.cache_type.parse()?;

    let cache = match cache_type {
        TrieNodeCacheType::LocalCache => match LocalCache::new(config.fast_cache_size_mb) {
            Some(local) => TrieNodeCache::Local(local),
            None => {
                info!("Trie node cache disabled (zero local cache size)");
                return Ok(CacheOutcome::Disabled);
            }
        },
        TrieNodeCacheType::RemoteCache => TrieNodeCache::Remote(RemoteCache::with_options(
            &config.redis_endpoints,
            config.redis_cluster_enable,
            config.remote_options(),
        )?),
        TrieNodeCacheType::HybridCache => TrieNodeCache::Hybrid(HybridCache::new(config)?),
    };

    info!(
        cache_type = %cache_type,
        fast_cache_size_mb = config.fast_cache_size_mb,
        redis_endpoints = config.redis_endpoints.len(),
        redis_cluster = config.redis_cluster_enable,
        "Trie node cache created"
    );

    Ok(CacheOutcome::Enabled(cache))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;

    fn config(
        cache_type: &str,
        size_mb: u64,
        endpoints: &[&str],
        cluster: bool,
    ) -> TrieNodeCacheConfig {
        TrieNodeCacheConfig {
            cache_type: cache_type.to_string(),
            fast_cache_size_mb: size_mb,
            redis_endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
            redis_cluster_enable: cluster,
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_sized_local_cache_is_disabled() {
        let outcome = new_trie_node_cache(&config("LocalCache", 0, &[], false)).unwrap();
        assert!(outcome.is_disabled());
        assert!(outcome.into_cache().is_none());
    }

    #[test]
    fn test_unsupported_type() {
        let result = new_trie_node_cache(&config("bogus", 64, &[], false));
        assert!(matches!(result, Err(CacheError::UnsupportedCacheType(ref t)) if t == "bogus"));
    }

    #[test]
    fn test_local_cache() {
        let outcome = new_trie_node_cache(&config("localcache", 16, &[], false)).unwrap();
        let cache = outcome.into_cache().unwrap();
        assert_eq!(cache.cache_type(), TrieNodeCacheType::LocalCache);
        match cache {
            TrieNodeCache::Local(local) => assert_eq!(local.max_bytes(), 16 * 1024 * 1024),
            _ => panic!("expected a local cache"),
        }
    }

    #[tokio::test]
    async fn test_remote_cache() {
        let outcome =
            new_trie_node_cache(&config("RemoteCache", 0, &["127.0.0.1:6379"], false)).unwrap();
        assert_eq!(
            outcome.into_cache().unwrap().cache_type(),
            TrieNodeCacheType::RemoteCache
        );
    }

    #[tokio::test]
    async fn test_remote_cluster_cache() {
        let endpoints = ["10.0.0.1:7000", "10.0.0.2:7000", "10.0.0.3:7000"];
        let outcome = new_trie_node_cache(&config("REMOTECACHE", 0, &endpoints, true)).unwrap();
        assert!(!outcome.is_disabled());
    }

    #[tokio::test]
    async fn test_remote_errors_propagate() {
        assert!(matches!(
            new_trie_node_cache(&config("RemoteCache", 0, &[], false)),
            Err(CacheError::NoEndpoints)
        ));
        assert!(matches!(
            new_trie_node_cache(&config("RemoteCache", 0, &["a:1", "b:2"], false)),
            Err(CacheError::TooManyEndpoints(2))
        ));
        assert!(matches!(
            new_trie_node_cache(&config("RemoteCache", 0, &["ftp://a:1"], false)),
            Err(CacheError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_remote_outside_runtime() {
        let result = new_trie_node_cache(&config("RemoteCache", 0, &["127.0.0.1:6379"], false));
        assert!(matches!(result, Err(CacheError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_hybrid_cache() {
        let outcome =
            new_trie_node_cache(&config("hybridcache", 8, &["127.0.0.1:6379"], false)).unwrap();
        match outcome.into_cache().unwrap() {
            TrieNodeCache::Hybrid(hybrid) => {
                assert_eq!(hybrid.local().max_bytes(), 8 * 1024 * 1024);
            }
            _ => panic!("expected a hybrid cache"),
        }
    }

    #[tokio::test]
    async fn test_hybrid_errors_propagate() {
        assert!(matches!(
            new_trie_node_cache(&config("HybridCache", 8, &[], false)),
            Err(CacheError::NoEndpoints)
        ));
        assert!(matches!(
            new_trie_node_cache(&config("HybridCache", 0, &["127.0.0.1:6379"], false)),
            Err(CacheError::HybridWithoutLocal)
        ));
    }
}
