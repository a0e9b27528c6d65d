//! Trie node caches for a state database
//!
//! Caches serialized Merkle-Patricia trie nodes keyed by the hash of their
//! content. Three interchangeable backends sit behind the [`NodeCache`]
//! interface:
//!
//! - [`LocalCache`]: bounded in-process cache with byte-weighted LRU eviction
//! - [`RemoteCache`]: best-effort client for a shared Redis store or cluster
//! - [`HybridCache`]: local tier in front of the remote tier, with promotion
//!
//! The cache is never authoritative. Every failure degrades to a miss, so
//! callers always fall through to the backing trie store when a lookup
//! returns `None`.

mod cache;
mod error;
mod factory;
mod hybrid;
mod local;
mod remote;
mod types;

#[cfg(test)]
mod testing;

pub use cache::{NodeCache, TrieNodeCache};
pub use error::{CacheError, Result};
pub use factory::{new_trie_node_cache, CacheOutcome};
pub use hybrid::HybridCache;
pub use local::LocalCache;
pub use remote::{RemoteCache, RemoteOptions};
pub use types::{CacheStats, TrieNodeCacheConfig, TrieNodeCacheType};
