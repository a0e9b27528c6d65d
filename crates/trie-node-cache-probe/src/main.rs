//! Trie node cache probe
//!
//! Builds the trie node cache a deployment is configured with, pushes a
//! synthetic set of content-addressed nodes through it and reports how
//! many reads the cache could serve.

mod error;
mod workload;

use crate::error::{ProbeError, Result};
use crate::workload::{generate_nodes, read_pass, write_nodes};
use clap::Parser;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};
use trie_node_cache::{new_trie_node_cache, CacheOutcome, TrieNodeCacheConfig};

#[derive(Parser, Debug)]
#[command(name = "trie-node-cache-probe")]
#[command(about = "Drive a synthetic trie node workload through the configured cache")]
struct Args {
    /// Number of distinct nodes to write
    #[arg(long, default_value_t = 10_000)]
    nodes: usize,

    /// Size of each node body in bytes
    #[arg(long, default_value_t = 512)]
    value_size: usize,

    /// Number of read passes after the write pass
    #[arg(long, default_value_t = 3)]
    rounds: usize,

    /// Overrides TRIE_NODE_CACHE_TYPE
    #[arg(long)]
    cache_type: Option<String>,

    /// Overrides TRIE_NODE_CACHE_FAST_SIZE_MB
    #[arg(long)]
    fast_cache_size_mb: Option<u64>,

    /// Overrides TRIE_NODE_CACHE_REDIS_ENDPOINTS; repeat for cluster nodes
    #[arg(long = "redis-endpoint")]
    redis_endpoints: Vec<String>,

    /// Overrides TRIE_NODE_CACHE_REDIS_CLUSTER
    #[arg(long)]
    redis_cluster: bool,
}

impl Args {
    fn apply(&self, config: &mut TrieNodeCacheConfig) {
        if let Some(cache_type) = &self.cache_type {
            config.cache_type.clone_from(cache_type);
        }
        if let Some(size) = self.fast_cache_size_mb {
            config.fast_cache_size_mb = size;
        }
        if !self.redis_endpoints.is_empty() {
            config.redis_endpoints.clone_from(&self.redis_endpoints);
        }
        if self.redis_cluster {
            config.redis_cluster_enable = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::from_default_env()
        .add_directive("trie_node_cache=info".parse()?)
        .add_directive("trie_node_cache_probe=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    let args = Args::parse();
    if args.nodes == 0 {
        return Err(ProbeError::Config("--nodes must be positive".to_string()));
    }

    let mut config = TrieNodeCacheConfig::from_env();
    args.apply(&mut config);
    info!(
        cache_type = %config.cache_type,
        fast_cache_size_mb = config.fast_cache_size_mb,
        redis_endpoints = ?config.redacted_endpoints(),
        redis_cluster = config.redis_cluster_enable,
        "Probe configuration"
    );

    let cache = match new_trie_node_cache(&config)? {
        CacheOutcome::Enabled(cache) => cache,
        CacheOutcome::Disabled => {
            warn!("Trie node cache is disabled by configuration, nothing to probe");
            return Ok(());
        }
    };

    let nodes = generate_nodes(args.nodes, args.value_size);

    let started = Instant::now();
    write_nodes(&cache, &nodes).await;
    info!(
        nodes = nodes.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Write pass finished"
    );

    for round in 1..=args.rounds {
        let started = Instant::now();
        let result = read_pass(&cache, &nodes).await;
        info!(
            round,
            hits = result.hits,
            misses = result.misses,
            corrupt = result.corrupt,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Read pass finished"
        );
        if result.corrupt > 0 {
            warn!(
                corrupt = result.corrupt,
                "Cache returned payloads that do not match their hash"
            );
        }
    }

    let stats = cache.stats();
    info!(hit_rate = stats.hit_rate(), "Cache statistics");
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_override_config() {
        let args = Args::parse_from([
            "trie-node-cache-probe",
            "--cache-type",
            "hybridcache",
            "--fast-cache-size-mb",
            "32",
            "--redis-endpoint",
            "10.0.0.1:7000",
            "--redis-endpoint",
            "10.0.0.2:7000",
            "--redis-cluster",
        ]);
        let mut config = TrieNodeCacheConfig::default();
        args.apply(&mut config);

        assert_eq!(config.cache_type, "hybridcache");
        assert_eq!(config.fast_cache_size_mb, 32);
        assert_eq!(config.redis_endpoints, vec!["10.0.0.1:7000", "10.0.0.2:7000"]);
        assert!(config.redis_cluster_enable);
    }

    #[test]
    fn test_defaults_leave_config_alone() {
        let args = Args::parse_from(["trie-node-cache-probe"]);
        assert_eq!(args.nodes, 10_000);
        assert_eq!(args.rounds, 3);

        let mut config = TrieNodeCacheConfig::default();
        args.apply(&mut config);
        assert_eq!(config, TrieNodeCacheConfig::default());
    }
}
