//! Synthetic content-addressed trie node workload

use sha2::{Digest, Sha256};
use trie_node_cache::NodeCache;

/// A serialized node and the hash it is stored under
pub struct Node {
    pub hash: Vec<u8>,
    pub body: Vec<u8>,
}

/// Deterministic node bodies of `value_size` bytes, keyed by their SHA-256
pub fn generate_nodes(count: usize, value_size: usize) -> Vec<Node> {
    (0..count as u64)
        .map(|i| {
            let seed = Sha256::digest(i.to_be_bytes());
            let body: Vec<u8> = seed.iter().copied().cycle().take(value_size).collect();
            let hash = Sha256::digest(&body).to_vec();
            Node { hash, body }
        })
        .collect()
}

/// Outcome of one read pass over the nodes
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PassResult {
    pub hits: usize,
    pub misses: usize,
    /// Hits whose payload did not hash back to the key
    pub corrupt: usize,
}

pub async fn write_nodes(cache: &dyn NodeCache, nodes: &[Node]) {
    for node in nodes {
        cache.set(&node.hash, &node.body).await;
    }
}

pub async fn read_pass(cache: &dyn NodeCache, nodes: &[Node]) -> PassResult {
    let mut result = PassResult::default();
    for node in nodes {
        match cache.has(&node.hash).await {
            Some(body) if Sha256::digest(&body).as_slice() == node.hash.as_slice() => {
                result.hits += 1
            }
            Some(_) => result.corrupt += 1,
            None => result.misses += 1,
        }
    }
    result
}
