//! Error types for trie node cache construction

use thiserror::Error;

/// Errors raised while validating configuration and building a cache.
///
/// Steady-state failures (network errors, timeouts) never show up here;
/// the backends absorb them and report a miss instead.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Not supported trie node cache type: {0:?}")]
    UnsupportedCacheType(String),

    #[error("No remote cache endpoints configured")]
    NoEndpoints,

    #[error("Invalid remote cache endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Non-cluster remote cache takes exactly one endpoint, got {0}")]
    TooManyEndpoints(usize),

    #[error("Endpoints incompatible with cluster mode: {0}")]
    ClusterIncompatible(String),

    #[error("Hybrid cache requires a non-zero local cache size")]
    HybridWithoutLocal,

    #[error("Remote cache client error: {0}")]
    Client(#[from] redis::RedisError),

    #[error("Remote cache must be constructed inside a tokio runtime")]
    NoRuntime,
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Failure of a single remote request. Stays inside the remote tier.
#[derive(Error, Debug)]
pub(crate) enum RemoteError {
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl RemoteError {
    /// Whether the failure says the store is unreachable rather than that
    /// one request was rejected.
    pub(crate) fn is_connectivity(&self) -> bool {
        match self {
            RemoteError::Timeout(_) => true,
            RemoteError::Redis(err) => {
                err.is_io_error()
                    || err.is_timeout()
                    || err.is_connection_refusal()
                    || err.is_connection_dropped()
                    || err.is_cluster_error()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_unsupported_type_display() {
        let err = CacheError::UnsupportedCacheType("bogus".to_string());
        assert_eq!(
            format!("{}", err),
            "Not supported trie node cache type: \"bogus\""
        );
    }

    #[test]
    fn test_invalid_endpoint_display() {
        let err = CacheError::InvalidEndpoint {
            endpoint: "http://x".to_string(),
            reason: "unsupported scheme".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Invalid remote cache endpoint \"http://x\": unsupported scheme"
        );
    }

    #[test]
    fn test_too_many_endpoints_display() {
        let err = CacheError::TooManyEndpoints(3);
        assert_eq!(
            format!("{}", err),
            "Non-cluster remote cache takes exactly one endpoint, got 3"
        );
    }

    #[test]
    fn test_timeout_is_connectivity() {
        assert!(RemoteError::Timeout(Duration::from_millis(5)).is_connectivity());
    }

    #[test]
    fn test_protocol_error_is_not_connectivity() {
        let err = RemoteError::from(redis::RedisError::from((
            redis::ErrorKind::TypeError,
            "wrong type",
        )));
        assert!(!err.is_connectivity());
    }

    #[test]
    fn test_io_error_is_connectivity() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = RemoteError::from(redis::RedisError::from(io));
        assert!(err.is_connectivity());
    }
}
