//! Object-store backend contract and implementations.
//!
//! The adapter only ever talks to a [`StoreBackend`]: a narrow, strongly
//! typed view of a key/value object store. Looseness in concrete clients
//! (optional lengths, store-specific not-found errors, pagination tokens) is
//! absorbed by the implementations.

use crate::{Result, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Largest number of keys a single `delete_batch` call may carry.
pub const DELETE_BATCH_SIZE: usize = 1000;

/// Metadata for a stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Object size in bytes.
    pub size: u64,
}

/// A trait for object-store backends.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Fetches an object; `None` if no object exists under `key`.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Stores an object, overwriting any existing one.
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Deletes an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Returns object metadata; `None` if no object exists under `key`.
    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>>;

    /// Checks if an object exists.
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.head(key).await?.is_some())
    }

    /// Lists every key beginning with `prefix`, following store pagination.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Deletes up to [`DELETE_BATCH_SIZE`] keys.
    async fn delete_batch(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.delete(key).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<T: StoreBackend + ?Sized> StoreBackend for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        (**self).put(key, data).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>> {
        (**self).head(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).list(prefix).await
    }

    async fn delete_batch(&self, keys: &[String]) -> Result<()> {
        (**self).delete_batch(keys).await
    }
}

/// Per-operation call counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// `get` calls.
    pub gets: u64,
    /// `put` calls.
    pub puts: u64,
    /// `delete` calls.
    pub deletes: u64,
    /// `head` calls.
    pub heads: u64,
    /// `list` calls.
    pub lists: u64,
    /// `delete_batch` calls.
    pub batches: u64,
}

#[derive(Debug, Default)]
struct BackendCounters {
    gets: AtomicU64,
    puts: AtomicU64,
    deletes: AtomicU64,
    heads: AtomicU64,
    lists: AtomicU64,
    batches: AtomicU64,
}

impl BackendCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> BackendStats {
        BackendStats {
            gets: self.gets.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            heads: self.heads.load(Ordering::Relaxed),
            lists: self.lists.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
        }
    }
}

/// An in-memory backend for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: RwLock<BTreeMap<String, Bytes>>,
    counters: BackendCounters,
}

impl MemoryBackend {
    /// Creates a new in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored objects.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Returns call counters since creation.
    pub fn stats(&self) -> BackendStats {
        self.counters.snapshot()
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        BackendCounters::bump(&self.counters.gets);
        Ok(self.data.read().get(key).cloned())
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        BackendCounters::bump(&self.counters.puts);
        self.data.write().insert(key.to_string(), data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        BackendCounters::bump(&self.counters.deletes);
        self.data.write().remove(key);
        Ok(())
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>> {
        BackendCounters::bump(&self.counters.heads);
        Ok(self.data.read().get(key).map(|data| ObjectMeta {
            size: data.len() as u64,
        }))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        BackendCounters::bump(&self.counters.lists);
        let data = self.data.read();
        Ok(data
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn delete_batch(&self, keys: &[String]) -> Result<()> {
        BackendCounters::bump(&self.counters.batches);
        if keys.len() > DELETE_BATCH_SIZE {
            return Err(StorageError::Transport(format!(
                "batch of {} keys exceeds limit of {}",
                keys.len(),
                DELETE_BATCH_SIZE
            )));
        }
        let mut data = self.data.write();
        for key in keys {
            data.remove(key);
        }
        Ok(())
    }
}

/// Bounds every call of the wrapped backend with a timeout.
///
/// An elapsed budget surfaces as [`StorageError::Timeout`]; nothing is
/// retried here.
pub struct TimeoutBackend<B> {
    inner: B,
    timeout: Duration,
}

impl<B> TimeoutBackend<B> {
    /// Wraps `inner` with the given per-call budget.
    pub fn new(inner: B, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Object store call timed out"
                );
                Err(StorageError::Timeout {
                    operation,
                    timeout: self.timeout,
                })
            }
        }
    }
}

#[async_trait]
impl<B: StoreBackend> StoreBackend for TimeoutBackend<B> {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.bounded("get", self.inner.get(key)).await
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        self.bounded("put", self.inner.put(key, data)).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.bounded("delete", self.inner.delete(key)).await
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>> {
        self.bounded("head", self.inner.head(key)).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.bounded("list", self.inner.list(prefix)).await
    }

    async fn delete_batch(&self, keys: &[String]) -> Result<()> {
        self.bounded("delete_batch", self.inner.delete_batch(keys)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_write_read() {
        let backend = MemoryBackend::new();
        backend.put("a/b", Bytes::from("test data")).await.unwrap();

        assert_eq!(backend.get("a/b").await.unwrap(), Some(Bytes::from("test data")));
        assert_eq!(backend.get("a/c").await.unwrap(), None);
        assert_eq!(backend.head("a/b").await.unwrap(), Some(ObjectMeta { size: 9 }));
    }

    #[tokio::test]
    async fn test_memory_backend_delete_is_idempotent() {
        let backend = MemoryBackend::new();
        backend.put("gone", Bytes::from_static(b"x")).await.unwrap();

        backend.delete("gone").await.unwrap();
        backend.delete("gone").await.unwrap();
        assert!(!backend.exists("gone").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_backend_list_by_prefix() {
        let backend = MemoryBackend::new();
        for key in ["p/a", "p/b/c", "pa/x", "q/a"] {
            backend.put(key, Bytes::new()).await.unwrap();
        }

        let keys = backend.list("p/").await.unwrap();
        assert_eq!(keys, vec!["p/a".to_string(), "p/b/c".to_string()]);
    }

    #[tokio::test]
    async fn test_memory_backend_rejects_oversized_batch() {
        let backend = MemoryBackend::new();
        let keys: Vec<String> = (0..DELETE_BATCH_SIZE + 1).map(|i| i.to_string()).collect();
        assert!(backend.delete_batch(&keys).await.is_err());
    }

    struct StalledBackend;

    #[async_trait]
    impl StoreBackend for StalledBackend {
        async fn get(&self, _key: &str) -> Result<Option<Bytes>> {
            std::future::pending().await
        }

        async fn put(&self, _key: &str, _data: Bytes) -> Result<()> {
            Ok(())
        }

        async fn delete(&self, _key: &str) -> Result<()> {
            Ok(())
        }

        async fn head(&self, _key: &str) -> Result<Option<ObjectMeta>> {
            Ok(None)
        }

        async fn list(&self, _prefix: &str) -> Result<Vec<String>> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_backend_surfaces_timeout() {
        let backend = TimeoutBackend::new(StalledBackend, Duration::from_secs(30));

        let err = backend.get("k").await.unwrap_err();
        assert!(matches!(err, StorageError::Timeout { operation: "get", .. }));

        let err = backend.list("p/").await.unwrap_err();
        assert!(matches!(err, StorageError::Timeout { operation: "list", .. }));
    }

    #[tokio::test]
    async fn test_timeout_backend_passes_through() {
        let backend = TimeoutBackend::new(MemoryBackend::new(), Duration::from_secs(1));
        backend.put("k", Bytes::from_static(b"v")).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), Some(Bytes::from_static(b"v")));
    }
}
