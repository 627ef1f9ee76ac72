//! [`StoreBackend`] over the `object_store` crate.
//!
//! One implementation serves every deployment target: a local directory,
//! an S3-compatible bucket, or the crate's own in-memory store.

use crate::backend::{ObjectMeta, StoreBackend};
use crate::{Result, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use std::sync::Arc;

/// Backend that delegates to any [`ObjectStore`].
#[derive(Clone)]
pub struct CloudBackend {
    store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for CloudBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudBackend")
            .field("store", &self.store.to_string())
            .finish()
    }
}

impl CloudBackend {
    /// Wraps an existing store.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Stores objects as files under `root`, creating it if needed.
    pub fn local(root: impl AsRef<std::path::Path>) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(|e| {
            StorageError::Transport(format!("cannot create {}: {}", root.display(), e))
        })?;
        let store = LocalFileSystem::new_with_prefix(root).map_err(transport)?;
        Ok(Self::new(Arc::new(store)))
    }

    /// Connects to an S3-compatible bucket.
    ///
    /// Credentials come from the standard `AWS_*` environment variables. A
    /// custom `endpoint` (MinIO and friends) also permits plain HTTP.
    pub fn s3(bucket: &str, region: Option<&str>, endpoint: Option<&str>) -> Result<Self> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
        if let Some(region) = region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = endpoint {
            builder = builder.with_endpoint(endpoint).with_allow_http(true);
        }
        let store = builder.build().map_err(transport)?;
        Ok(Self::new(Arc::new(store)))
    }

    /// Uses the `object_store` in-memory implementation.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }
}

fn transport(err: object_store::Error) -> StorageError {
    StorageError::Transport(err.to_string())
}

fn is_missing(err: &object_store::Error) -> bool {
    matches!(err, object_store::Error::NotFound { .. })
}

/// Directory to hand to a segment-aware `list` so that every key starting
/// with `prefix` is returned.
fn list_root(prefix: &str) -> Option<Path> {
    let dir = match prefix.rfind('/') {
        Some(idx) => &prefix[..idx],
        None => "",
    };
    if dir.is_empty() {
        None
    } else {
        Some(Path::from(dir))
    }
}

#[async_trait]
impl StoreBackend for CloudBackend {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let result = match self.store.get(&Path::from(key)).await {
            Ok(result) => result,
            Err(err) if is_missing(&err) => return Ok(None),
            Err(err) => return Err(transport(err)),
        };
        let data = result.bytes().await.map_err(transport)?;
        Ok(Some(data))
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        self.store
            .put(&Path::from(key), PutPayload::from(data))
            .await
            .map_err(transport)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self.store.delete(&Path::from(key)).await {
            Ok(()) => Ok(()),
            Err(err) if is_missing(&err) => Ok(()),
            Err(err) => Err(transport(err)),
        }
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>> {
        match self.store.head(&Path::from(key)).await {
            Ok(meta) => Ok(Some(ObjectMeta {
                size: meta.size as u64,
            })),
            Err(err) if is_missing(&err) => Ok(None),
            Err(err) => Err(transport(err)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let root = list_root(prefix);
        let metas: Vec<object_store::ObjectMeta> = self
            .store
            .list(root.as_ref())
            .try_collect()
            .await
            .map_err(transport)?;

        let mut keys: Vec<String> = metas
            .into_iter()
            .map(|meta| meta.location.to_string())
            .filter(|key| key.starts_with(prefix))
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn delete_batch(&self, keys: &[String]) -> Result<()> {
        let locations = futures::stream::iter(
            keys.iter()
                .map(|key| Ok(Path::from(key.as_str())))
                .collect::<Vec<_>>(),
        )
        .boxed();

        let results: Vec<_> = self.store.delete_stream(locations).collect().await;
        for result in results {
            match result {
                Ok(_) => {}
                Err(err) if is_missing(&err) => {}
                Err(err) => return Err(transport(err)),
            }
        }
        Ok(())
    }
}
