//! Error types for the trie node cache probe

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Cache error: {0}")]
    Cache(#[from] trie_node_cache::CacheError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<tracing_subscriber::filter::ParseError> for ProbeError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        ProbeError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProbeError>;
