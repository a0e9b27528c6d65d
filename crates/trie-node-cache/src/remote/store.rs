//! Transport to the shared key/value store

use super::endpoint::redact;
use crate::error::{CacheError, RemoteError};
use async_trait::async_trait;
use futures::future::try_join_all;
use redis::aio::ConnectionManager;
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;
use tokio::sync::OnceCell;
use tracing::info;

/// Raw byte transport used by the remote tier.
///
/// Implementations report every failure; the remote tier decides how to
/// degrade.
#[async_trait]
pub(crate) trait RemoteStore: Send + Sync + 'static {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, RemoteError>;

    async fn set(&self, key: &[u8], value: &[u8]) -> Result<(), RemoteError>;

    /// Store a batch of entries. Stops at the first failure.
    async fn set_many(&self, entries: &[(Vec<u8>, Vec<u8>)]) -> Result<(), RemoteError> {
        for (key, value) in entries {
            self.set(key, value).await?;
        }
        Ok(())
    }
}

/// Redis transport for a single server or a cluster.
///
/// Connections are opened on first use and reused by all callers. A failed
/// connect leaves the cell empty so the next request tries again.
pub(crate) enum RedisStore {
    Single {
        client: redis::Client,
        conn: OnceCell<ConnectionManager>,
    },
    Cluster {
        client: ClusterClient,
        conn: OnceCell<ClusterConnection>,
    },
}

impl RedisStore {
    /// Build a client for already validated endpoint URLs
    pub(crate) fn open(urls: Vec<String>, cluster: bool) -> Result<Self, CacheError> {
        if cluster {
            info!(nodes = urls.len(), "Using redis cluster for trie node cache");
            Ok(RedisStore::Cluster {
                client: ClusterClient::new(urls)?,
                conn: OnceCell::new(),
            })
        } else {
            let url = urls.into_iter().next().ok_or(CacheError::NoEndpoints)?;
            info!(endpoint = %redact(&url), "Using redis server for trie node cache");
            Ok(RedisStore::Single {
                client: redis::Client::open(url)?,
                conn: OnceCell::new(),
            })
        }
    }

    async fn single(
        client: &redis::Client,
        conn: &OnceCell<ConnectionManager>,
    ) -> Result<ConnectionManager, RemoteError> {
        let conn = conn
            .get_or_try_init(|| ConnectionManager::new(client.clone()))
            .await?;
        Ok(conn.clone())
    }

    async fn cluster(
        client: &ClusterClient,
        conn: &OnceCell<ClusterConnection>,
    ) -> Result<ClusterConnection, RemoteError> {
        let conn = conn
            .get_or_try_init(|| client.get_async_connection())
            .await?;
        Ok(conn.clone())
    }
}

#[async_trait]
impl RemoteStore for RedisStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, RemoteError> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);

        let value: Option<Vec<u8>> = match self {
            RedisStore::Single { client, conn } => {
                let mut conn = Self::single(client, conn).await?;
                cmd.query_async(&mut conn).await?
            }
            RedisStore::Cluster { client, conn } => {
                let mut conn = Self::cluster(client, conn).await?;
                cmd.query_async(&mut conn).await?
            }
        };
        Ok(value)
    }

    async fn set(&self, key: &[u8], value: &[u8]) -> Result<(), RemoteError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);

        match self {
            RedisStore::Single { client, conn } => {
                let mut conn = Self::single(client, conn).await?;
                let _: () = cmd.query_async(&mut conn).await?;
            }
            RedisStore::Cluster { client, conn } => {
                let mut conn = Self::cluster(client, conn).await?;
                let _: () = cmd.query_async(&mut conn).await?;
            }
        }
        Ok(())
    }

    /// A single server takes the batch as one pipeline. Cluster keys hash to
    /// different slots, so each SET is routed on its own and the requests
    /// share the multiplexed connection concurrently.
    async fn set_many(&self, entries: &[(Vec<u8>, Vec<u8>)]) -> Result<(), RemoteError> {
        match self {
            RedisStore::Single { client, conn } => {
                let mut conn = Self::single(client, conn).await?;
                let mut pipe = redis::pipe();
                for (key, value) in entries {
                    pipe.cmd("SET").arg(key).arg(value).ignore();
                }
                let _: () = pipe.query_async(&mut conn).await?;
            }
            RedisStore::Cluster { client, conn } => {
                let conn = Self::cluster(client, conn).await?;
                try_join_all(entries.iter().map(|(key, value)| {
                    let mut conn = conn.clone();
                    async move {
                        let _: () = redis::cmd("SET")
                            .arg(key)
                            .arg(value)
                            .query_async(&mut conn)
                            .await?;
                        Ok::<_, redis::RedisError>(())
                    }
                }))
                .await?;
            }
        }
        Ok(())
    }
}
