//! Repository records and prefix allocation.
//!
//! Records live in memory for lookups and are persisted as JSON under
//! `_registry/<owner>/<name>.json` in the same object store that holds the
//! repositories, so a restarted node finds them again.

use crate::WebError;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use stratus_storage::StoreBackend;
use stratus_types::{Repository, RepositoryId};
use tracing::{debug, info, warn};

/// Key prefix of persisted repository records.
pub const REGISTRY_ROOT: &str = "_registry";

/// Registry of hosted repositories.
pub struct RepoRegistry {
    backend: Arc<dyn StoreBackend>,
    repos: RwLock<HashMap<String, Repository>>,
}

fn full_name(owner: &str, name: &str) -> String {
    format!("{}/{}", owner, name)
}

fn record_key(owner: &str, name: &str) -> String {
    format!("{}/{}/{}.json", REGISTRY_ROOT, owner, name)
}

impl RepoRegistry {
    /// Creates an empty registry.
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self {
            backend,
            repos: RwLock::new(HashMap::new()),
        }
    }

    /// Loads every persisted record. Unreadable records are skipped.
    pub async fn load(backend: Arc<dyn StoreBackend>) -> Result<Self, WebError> {
        let registry = Self::new(backend);
        let keys = registry
            .backend
            .list(&format!("{}/", REGISTRY_ROOT))
            .await?;

        let mut loaded = HashMap::new();
        for key in keys.iter().filter(|key| key.ends_with(".json")) {
            let Some(data) = registry.backend.get(key).await? else {
                continue;
            };
            match serde_json::from_slice::<Repository>(&data) {
                Ok(record) => {
                    loaded.insert(full_name(&record.owner, &record.name), record);
                }
                Err(err) => warn!(key = %key, error = %err, "Skipping unreadable repository record"),
            }
        }

        info!(repositories = loaded.len(), "Loaded repository registry");
        *registry.repos.write() = loaded;
        Ok(registry)
    }

    /// Looks up a repository record.
    pub fn get(&self, owner: &str, name: &str) -> Option<Repository> {
        self.repos.read().get(&full_name(owner, name)).cloned()
    }

    /// Number of registered repositories.
    pub fn len(&self) -> usize {
        self.repos.read().len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.repos.read().is_empty()
    }

    /// Registers a new repository and assigns it an unused prefix.
    ///
    /// The record is reserved in memory before it is persisted; a failed
    /// write releases the reservation.
    pub async fn create(&self, record: Repository) -> Result<Repository, WebError> {
        let key = full_name(&record.owner, &record.name);
        let record = {
            let mut repos = self.repos.write();
            if repos.contains_key(&key) {
                return Err(WebError::Conflict(format!(
                    "repository '{}' already exists",
                    key
                )));
            }
            let mut salt = 0;
            let prefix = loop {
                let candidate = RepositoryId::generate(&record.owner, &record.name, salt).prefix();
                if !repos.values().any(|r| r.prefix == candidate) {
                    break candidate;
                }
                salt += 1;
            };
            let record = Repository { prefix, ..record };
            repos.insert(key.clone(), record.clone());
            record
        };

        if let Err(err) = self.persist(&record).await {
            self.repos.write().remove(&key);
            return Err(err);
        }
        debug!(repo = %key, prefix = %record.prefix, "Registered repository");
        Ok(record)
    }

    /// Renames a repository. The prefix, and so the data, stays where it is.
    pub async fn rename(&self, owner: &str, name: &str, new_name: &str) -> Result<Repository, WebError> {
        let old_key = full_name(owner, name);
        let new_key = full_name(owner, new_name);
        let (old, renamed) = {
            let mut repos = self.repos.write();
            if repos.contains_key(&new_key) {
                return Err(WebError::Conflict(format!(
                    "repository '{}' already exists",
                    new_key
                )));
            }
            let old = repos
                .remove(&old_key)
                .ok_or_else(|| WebError::repo_not_found(owner, name))?;
            let renamed = Repository {
                name: new_name.to_string(),
                ..old.clone()
            };
            repos.insert(new_key.clone(), renamed.clone());
            (old, renamed)
        };

        if let Err(err) = self.persist(&renamed).await {
            let mut repos = self.repos.write();
            repos.remove(&new_key);
            repos.insert(old_key, old);
            return Err(err);
        }
        if let Err(err) = self.backend.delete(&record_key(owner, name)).await {
            // The new record is authoritative; a leftover old record only
            // resurfaces the old name after a restart.
            warn!(repo = %old_key, error = %err, "Failed to remove old repository record");
        }

        info!(from = %old_key, to = %new_key, "Renamed repository");
        Ok(renamed)
    }

    /// Unregisters a repository and deletes its record.
    pub async fn remove(&self, owner: &str, name: &str) -> Result<(), WebError> {
        self.backend.delete(&record_key(owner, name)).await?;
        self.repos.write().remove(&full_name(owner, name));
        debug!(repo = %full_name(owner, name), "Unregistered repository");
        Ok(())
    }

    async fn persist(&self, record: &Repository) -> Result<(), WebError> {
        let json = serde_json::to_vec(record).map_err(|e| WebError::Internal(e.to_string()))?;
        self.backend
            .put(&record_key(&record.owner, &record.name), Bytes::from(json))
            .await?;
        Ok(())
    }
}
