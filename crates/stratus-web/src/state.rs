//! Shared application state.

use crate::RepoRegistry;
use std::sync::Arc;
use stratus_git::Repository;
use stratus_storage::{CacheLayer, RepoFs, StoreBackend};
use stratus_types::Repository as RepoRecord;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository records.
    pub registry: Arc<RepoRegistry>,
    /// Object store holding every repository.
    pub backend: Arc<dyn StoreBackend>,
    /// Process-wide read caches.
    pub cache: Arc<CacheLayer>,
}

impl AppState {
    /// Creates the state.
    pub fn new(registry: Arc<RepoRegistry>, backend: Arc<dyn StoreBackend>, cache: Arc<CacheLayer>) -> Self {
        Self {
            registry,
            backend,
            cache,
        }
    }

    /// A fresh filesystem adapter scoped to the repository's prefix.
    pub fn filesystem(&self, record: &RepoRecord) -> RepoFs {
        RepoFs::new(self.backend.clone(), &record.prefix, self.cache.clone())
    }

    /// Opens the repository for one request.
    pub fn open(&self, record: &RepoRecord) -> Repository<RepoFs> {
        Repository::open(self.filesystem(record))
    }
}
