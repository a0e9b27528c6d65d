//! In-memory remote store for tests

use crate::error::RemoteError;
use crate::remote::RemoteStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StoreMode {
    Healthy,
    /// Connection refused on every request
    Failing,
    /// Requests are answered with a protocol error
    Rejecting,
    /// Requests never complete
    Hanging,
}

pub(crate) struct MemoryStore {
    entries: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
    mode: Mutex<StoreMode>,
    gets: AtomicUsize,
    sets: AtomicUsize,
    batches: AtomicUsize,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            mode: Mutex::new(StoreMode::Healthy),
            gets: AtomicUsize::new(0),
            sets: AtomicUsize::new(0),
            batches: AtomicUsize::new(0),
        }
    }

    pub(crate) fn set_mode(&self, mode: StoreMode) {
        *self.mode.lock().unwrap() = mode;
    }

    /// Seed a value without counting it as a request
    pub(crate) fn insert(&self, key: &[u8], value: &[u8]) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_vec(), value.to_vec());
    }

    pub(crate) fn value(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub(crate) fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub(crate) fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub(crate) fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    /// Yield until a background write for `key` has landed
    pub(crate) async fn wait_for(&self, key: &[u8]) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.value(key).is_none() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("background write never reached the store");
    }

    async fn check(&self) -> Result<(), RemoteError> {
        let mode = *self.mode.lock().unwrap();
        match mode {
            StoreMode::Healthy => Ok(()),
            StoreMode::Failing => Err(RemoteError::from(redis::RedisError::from(
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            ))),
            StoreMode::Rejecting => Err(RemoteError::from(redis::RedisError::from((
                redis::ErrorKind::TypeError,
                "WRONGTYPE",
            )))),
            StoreMode::Hanging => std::future::pending().await,
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, RemoteError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check().await?;
        Ok(self.value(key))
    }

    async fn set(&self, key: &[u8], value: &[u8]) -> Result<(), RemoteError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.check().await?;
        self.insert(key, value);
        Ok(())
    }

    async fn set_many(&self, entries: &[(Vec<u8>, Vec<u8>)]) -> Result<(), RemoteError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.sets.fetch_add(entries.len(), Ordering::SeqCst);
        self.check().await?;
        for (key, value) in entries {
            self.insert(key, value);
        }
        Ok(())
    }
}
