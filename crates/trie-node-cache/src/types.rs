//! Cache types and configuration

use crate::error::CacheError;
use crate::remote::{redact_endpoint, RemoteOptions};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_FAST_CACHE_SIZE_MB: u64 = 512;
const DEFAULT_REDIS_TIMEOUT_MS: u64 = 1000;
const DEFAULT_REDIS_RETRY_BACKOFF_MS: u64 = 1000;
const DEFAULT_REDIS_WRITE_QUEUE_SIZE: usize = 10_000;

/// The supported trie node cache backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrieNodeCacheType {
    LocalCache,
    RemoteCache,
    HybridCache,
}

impl TrieNodeCacheType {
    pub const ALL: [TrieNodeCacheType; 3] = [
        TrieNodeCacheType::LocalCache,
        TrieNodeCacheType::RemoteCache,
        TrieNodeCacheType::HybridCache,
    ];

    /// Canonical name of the cache type
    pub fn as_str(&self) -> &'static str {
        match self {
            TrieNodeCacheType::LocalCache => "LocalCache",
            TrieNodeCacheType::RemoteCache => "RemoteCache",
            TrieNodeCacheType::HybridCache => "HybridCache",
        }
    }

    /// Match a configured name against the supported types, ignoring case
    pub fn to_valid(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|valid| valid.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for TrieNodeCacheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrieNodeCacheType {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::to_valid(s).ok_or_else(|| CacheError::UnsupportedCacheType(s.to_string()))
    }
}

/// Configuration of all trie node cache backends.
///
/// `cache_type` is kept as the raw configured string; it is validated and
/// normalized when the cache is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TrieNodeCacheConfig {
    pub cache_type: String,
    /// Memory allowance in MB for the local tier
    #[serde(rename = "FastCacheSizeMB")]
    pub fast_cache_size_mb: u64,
    /// Redis endpoints, `host:port` or `redis://host:port`
    pub redis_endpoints: Vec<String>,
    pub redis_cluster_enable: bool,
    /// Per-request deadline for the remote tier
    pub redis_timeout_ms: u64,
    /// How long the remote tier stays bypassed after a connectivity failure
    pub redis_retry_backoff_ms: u64,
    /// Capacity of the asynchronous remote write queue
    pub redis_write_queue_size: usize,
}

impl Default for TrieNodeCacheConfig {
    fn default() -> Self {
        Self {
            cache_type: TrieNodeCacheType::LocalCache.to_string(),
            fast_cache_size_mb: DEFAULT_FAST_CACHE_SIZE_MB,
            redis_endpoints: Vec::new(),
            redis_cluster_enable: false,
            redis_timeout_ms: DEFAULT_REDIS_TIMEOUT_MS,
            redis_retry_backoff_ms: DEFAULT_REDIS_RETRY_BACKOFF_MS,
            redis_write_queue_size: DEFAULT_REDIS_WRITE_QUEUE_SIZE,
        }
    }
}

impl TrieNodeCacheConfig {
    /// Parse configuration from `TRIE_NODE_CACHE_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cache_type = lookup("TRIE_NODE_CACHE_TYPE").unwrap_or(defaults.cache_type);

        let fast_cache_size_mb = lookup("TRIE_NODE_CACHE_FAST_SIZE_MB")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.fast_cache_size_mb);

        let redis_endpoints = lookup("TRIE_NODE_CACHE_REDIS_ENDPOINTS")
            .map(|s| {
                s.split(',')
                    .map(|e| e.trim().to_string())
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let redis_cluster_enable = lookup("TRIE_NODE_CACHE_REDIS_CLUSTER")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.redis_cluster_enable);

        let redis_timeout_ms = lookup("TRIE_NODE_CACHE_REDIS_TIMEOUT_MS")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.redis_timeout_ms);

        let redis_retry_backoff_ms = lookup("TRIE_NODE_CACHE_REDIS_RETRY_BACKOFF_MS")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.redis_retry_backoff_ms);

        let redis_write_queue_size = lookup("TRIE_NODE_CACHE_REDIS_WRITE_QUEUE")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.redis_write_queue_size);

        Self {
            cache_type,
            fast_cache_size_mb,
            redis_endpoints,
            redis_cluster_enable,
            redis_timeout_ms,
            redis_retry_backoff_ms,
            redis_write_queue_size,
        }
    }

    /// Tuning knobs for the remote tier
    pub fn remote_options(&self) -> RemoteOptions {
        RemoteOptions {
            timeout: Duration::from_millis(self.redis_timeout_ms),
            retry_backoff: Duration::from_millis(self.redis_retry_backoff_ms),
            write_queue_size: self.redis_write_queue_size,
        }
    }

    /// The configured endpoints with credentials removed, safe to log
    pub fn redacted_endpoints(&self) -> Vec<String> {
        self.redis_endpoints
            .iter()
            .map(|endpoint| redact_endpoint(endpoint))
            .collect()
    }
}

/// Counters reported by a running cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub local_hits: u64,
    pub local_misses: u64,
    pub remote_hits: u64,
    pub remote_misses: u64,
    pub remote_errors: u64,
    /// Remote writes that never reached the store: queue overflow, failed
    /// requests and writes skipped while the store is bypassed
    pub dropped_writes: u64,
    pub promotions: u64,
    pub entries: u64,
    pub resident_bytes: u64,
}

impl CacheStats {
    /// Fraction of lookups served by any tier (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let hits = self.local_hits + self.remote_hits;
        // A remote lookup only happens after a local miss in the hybrid
        // cache, so those misses are not counted twice.
        let lookups = if self.local_hits + self.local_misses > 0 {
            self.local_hits + self.local_misses
        } else {
            self.remote_hits + self.remote_misses
        };
        if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64
        }
    }
}
