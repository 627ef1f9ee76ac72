//! Filesystem view of a repository prefix.
//!
//! [`RepoFs`] gives the plumbing engine the file operations it expects
//! (read, write, readdir, stat, mkdir) on top of a flat key/value store.
//! Directories are derived: a path is a directory when some key exists
//! beneath it, or when it was created with `mkdir` on this adapter instance.

use crate::backend::{StoreBackend, DELETE_BATCH_SIZE};
use crate::cache::CacheLayer;
use crate::key;
use crate::{Result, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of [`Filesystem::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    /// An object is stored at the path.
    pub is_file: bool,
    /// Keys exist beneath the path, or it is a marker directory.
    pub is_directory: bool,
    /// Object size; zero for pure directories.
    pub size: u64,
}

/// Outcome of a completed [`Filesystem::remove_subtree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteReport {
    /// Keys deleted.
    pub deleted: usize,
    /// Batches issued.
    pub batches: usize,
}

/// File operations consumed by the plumbing engine.
///
/// All paths are relative to the repository root; `""` is the root itself.
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Reads a whole file.
    async fn read(&self, path: &str) -> Result<Bytes>;

    /// Reads a whole file as UTF-8.
    async fn read_to_string(&self, path: &str) -> Result<String> {
        let data = self.read(path).await?;
        String::from_utf8(data.to_vec())
            .map_err(|_| StorageError::InvalidData(format!("{} is not valid UTF-8", path)))
    }

    /// Creates or overwrites a file.
    async fn write(&self, path: &str, data: Bytes) -> Result<()>;

    /// Removes a file. Removing a missing file succeeds.
    async fn remove(&self, path: &str) -> Result<()>;

    /// Names of the direct children of a directory, sorted.
    async fn list_children(&self, path: &str) -> Result<Vec<String>>;

    /// Removes every file beneath a directory.
    async fn remove_subtree(&self, path: &str) -> Result<DeleteReport>;

    /// Describes a path.
    async fn stat(&self, path: &str) -> Result<Metadata>;

    /// Creates an empty directory.
    async fn mkdir(&self, path: &str) -> Result<()>;

    /// Symlinks are not materialized; this does nothing.
    async fn symlink(&self, _target: &str, _path: &str) -> Result<()> {
        Ok(())
    }

    /// No path is ever a symlink.
    async fn readlink(&self, path: &str) -> Result<String> {
        Err(StorageError::NotFound(path.to_string()))
    }
}

#[async_trait]
impl<T: Filesystem + ?Sized> Filesystem for Arc<T> {
    async fn read(&self, path: &str) -> Result<Bytes> {
        (**self).read(path).await
    }

    async fn write(&self, path: &str, data: Bytes) -> Result<()> {
        (**self).write(path, data).await
    }

    async fn remove(&self, path: &str) -> Result<()> {
        (**self).remove(path).await
    }

    async fn list_children(&self, path: &str) -> Result<Vec<String>> {
        (**self).list_children(path).await
    }

    async fn remove_subtree(&self, path: &str) -> Result<DeleteReport> {
        (**self).remove_subtree(path).await
    }

    async fn stat(&self, path: &str) -> Result<Metadata> {
        (**self).stat(path).await
    }

    async fn mkdir(&self, path: &str) -> Result<()> {
        (**self).mkdir(path).await
    }
}

/// Which cache a file read goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheRoute {
    Objects,
    Refs,
    Uncached,
}

impl CacheRoute {
    fn for_path(relative: &str) -> Self {
        if relative.starts_with("objects/") {
            CacheRoute::Objects
        } else if relative == "HEAD" || relative == "packed-refs" || relative.starts_with("refs/") {
            CacheRoute::Refs
        } else {
            CacheRoute::Uncached
        }
    }
}

/// A repository adapter bound to one object-store prefix.
///
/// Cheap to construct; the caches are shared, while the empty-directory
/// markers live only as long as this instance.
pub struct RepoFs {
    backend: Arc<dyn StoreBackend>,
    prefix: String,
    cache: Arc<CacheLayer>,
    markers: Mutex<HashSet<String>>,
}

impl RepoFs {
    /// Creates an adapter for `prefix`.
    pub fn new(backend: Arc<dyn StoreBackend>, prefix: impl AsRef<str>, cache: Arc<CacheLayer>) -> Self {
        Self {
            backend,
            prefix: key::normalize(prefix.as_ref()),
            cache,
            markers: Mutex::new(HashSet::new()),
        }
    }

    /// The object-store prefix this adapter owns.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Validates and normalizes a relative path.
    fn resolve(&self, path: &str) -> Result<(String, String)> {
        key::validate_relative_path(path)?;
        let relative = key::normalize(path);
        let key = key::to_key(&self.prefix, &relative);
        Ok((relative, key))
    }

    fn listing_key(&self, key: &str) -> String {
        format!("{}/", key)
    }

    fn invalidate(&self) {
        self.cache.invalidate_prefix(&self.prefix);
    }

    async fn fetch(&self, key: &str) -> Result<Option<Bytes>> {
        self.backend.get(key).await
    }

    /// Direct children stored under `listing_key`, through the listings cache.
    async fn listing(&self, listing_key: String) -> Result<Arc<Vec<String>>> {
        let listings = self.cache.listings();
        if let Some(children) = listings.get(&listing_key) {
            return Ok(children);
        }

        let generation = listings.generation();
        let keys = self.backend.list(&listing_key).await?;
        let children: BTreeSet<String> = keys
            .iter()
            .filter_map(|key| key.strip_prefix(listing_key.as_str()))
            .filter_map(|rest| rest.split('/').next())
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        let children = Arc::new(children.into_iter().collect::<Vec<_>>());
        listings.insert_if_generation(listing_key, children.clone(), generation);
        Ok(children)
    }

    fn marker_children(&self, relative: &str) -> Vec<String> {
        self.markers
            .lock()
            .iter()
            .filter(|marker| !marker.is_empty() && key::parent(marker) == relative)
            .filter_map(|marker| marker.rsplit('/').next().map(str::to_string))
            .collect()
    }

    fn is_marker(&self, relative: &str) -> bool {
        relative.is_empty() || self.markers.lock().contains(relative)
    }
}

#[async_trait]
impl Filesystem for RepoFs {
    async fn read(&self, path: &str) -> Result<Bytes> {
        let (relative, key) = self.resolve(path)?;
        let cache = match CacheRoute::for_path(&relative) {
            CacheRoute::Objects => Some(self.cache.objects()),
            CacheRoute::Refs => Some(self.cache.refs()),
            CacheRoute::Uncached => None,
        };

        if let Some(cached) = cache.and_then(|cache| cache.get(&key)) {
            return Ok(cached);
        }

        let generation = cache.map(|cache| cache.generation());
        let data = self
            .fetch(&key)
            .await?
            .ok_or_else(|| StorageError::NotFound(relative.clone()))?;
        if let (Some(cache), Some(generation)) = (cache, generation) {
            if !cache.insert_if_generation(key, data.clone(), generation) {
                debug!(path = %relative, "Skipped cache fill after concurrent write");
            }
        }
        Ok(data)
    }

    async fn write(&self, path: &str, data: Bytes) -> Result<()> {
        let (relative, key) = self.resolve(path)?;
        if relative.is_empty() {
            return Err(StorageError::MalformedPath(
                "cannot write to the repository root".to_string(),
            ));
        }
        let size = data.len();
        self.backend.put(&key, data).await?;
        self.invalidate();
        debug!(path = %relative, size, "Wrote file");
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let (_, key) = self.resolve(path)?;
        self.backend.delete(&key).await?;
        self.invalidate();
        Ok(())
    }

    async fn list_children(&self, path: &str) -> Result<Vec<String>> {
        let (relative, key) = self.resolve(path)?;
        let listing_key = self.listing_key(&key);

        let listed = self.listing(listing_key).await?;

        let markers = self.marker_children(&relative);
        if markers.is_empty() {
            return Ok(listed.as_ref().clone());
        }
        let merged: BTreeSet<String> = listed.iter().cloned().chain(markers).collect();
        Ok(merged.into_iter().collect())
    }

    async fn remove_subtree(&self, path: &str) -> Result<DeleteReport> {
        let (relative, key) = self.resolve(path)?;
        let listing_key = self.listing_key(&key);
        let keys = self.backend.list(&listing_key).await?;

        let mut report = DeleteReport::default();
        let mut failed = 0;
        let mut first_failure: Option<String> = None;

        for chunk in keys.chunks(DELETE_BATCH_SIZE) {
            report.batches += 1;
            match self.backend.delete_batch(chunk).await {
                Ok(()) => report.deleted += chunk.len(),
                Err(err) => {
                    warn!(
                        path = %relative,
                        batch = report.batches,
                        keys = chunk.len(),
                        error = %err,
                        "Delete batch failed"
                    );
                    failed += chunk.len();
                    first_failure.get_or_insert_with(|| err.to_string());
                }
            }
        }

        self.markers.lock().retain(|marker| {
            !(relative.is_empty()
                || marker == &relative
                || marker
                    .strip_prefix(relative.as_str())
                    .is_some_and(|rest| rest.starts_with('/')))
        });
        self.invalidate();

        match first_failure {
            None => {
                debug!(path = %relative, deleted = report.deleted, batches = report.batches, "Removed subtree");
                Ok(report)
            }
            Some(reason) => Err(StorageError::PartialDelete {
                deleted: report.deleted,
                failed,
                reason,
            }),
        }
    }

    async fn stat(&self, path: &str) -> Result<Metadata> {
        let (relative, key) = self.resolve(path)?;

        if !relative.is_empty() {
            if let Some(meta) = self.backend.head(&key).await? {
                return Ok(Metadata {
                    is_file: true,
                    is_directory: false,
                    size: meta.size,
                });
            }
        }

        if self.is_marker(&relative) {
            return Ok(Metadata {
                is_file: false,
                is_directory: true,
                size: 0,
            });
        }

        if !self.listing(self.listing_key(&key)).await?.is_empty() {
            return Ok(Metadata {
                is_file: false,
                is_directory: true,
                size: 0,
            });
        }

        Err(StorageError::NotFound(relative))
    }

    async fn mkdir(&self, path: &str) -> Result<()> {
        let (relative, _) = self.resolve(path)?;
        let mut markers = self.markers.lock();
        let mut current = relative.as_str();
        while !current.is_empty() {
            markers.insert(current.to_string());
            current = key::parent(current);
        }
        Ok(())
    }
}
