use crate::models::BranchesResponse;
use stratus_git::Repository;
use stratus_storage::Filesystem;
use stratus_types::Repository as RepoRecord;
use tracing::warn;

/// Lists branches. Never fails: an unreadable repository has no branches.
pub async fn list_branches<F: Filesystem>(repo: &Repository<F>, record: &RepoRecord) -> BranchesResponse {
    let branches = match repo.list_branches().await {
        Ok(branches) => branches,
        Err(err) => {
            warn!(repo = %record.full_name(), error = %err, "Failed to enumerate branches");
            Vec::new()
        }
    };
    let default_branch = match repo.head_branch().await {
        Ok(Some(branch)) => branch,
        Ok(None) => record.default_branch.clone(),
        Err(err) => {
            warn!(repo = %record.full_name(), error = %err, "Failed to read HEAD");
            record.default_branch.clone()
        }
    };

    BranchesResponse {
        branches,
        default_branch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{commit, empty_repo};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Arc;
    use stratus_storage::{CacheLayer, ObjectMeta, RepoFs, Result, StorageError, StoreBackend};

    #[tokio::test]
    async fn test_lists_branches_and_default() {
        let (record, repo) = empty_repo().await;
        let first = commit(&repo, &[("a", "1\n")], vec![], 100, "one").await;
        repo.update_ref("feature/x", first).await.unwrap();

        let response = list_branches(&repo, &record).await;
        assert_eq!(response.branches, vec!["feature/x".to_string(), "main".to_string()]);
        assert_eq!(response.default_branch, "main");
    }

    struct BrokenBackend;

    #[async_trait]
    impl StoreBackend for BrokenBackend {
        async fn get(&self, _key: &str) -> Result<Option<Bytes>> {
            Err(StorageError::Transport("connection reset".into()))
        }
        async fn put(&self, _key: &str, _data: Bytes) -> Result<()> {
            Err(StorageError::Transport("connection reset".into()))
        }
        async fn delete(&self, _key: &str) -> Result<()> {
            Err(StorageError::Transport("connection reset".into()))
        }
        async fn head(&self, _key: &str) -> Result<Option<ObjectMeta>> {
            Err(StorageError::Transport("connection reset".into()))
        }
        async fn list(&self, _prefix: &str) -> Result<Vec<String>> {
            Err(StorageError::Transport("connection reset".into()))
        }
    }

    #[tokio::test]
    async fn test_engine_failure_yields_empty_list() {
        let record = RepoRecord::new("alice", "repo", "repos/broken").with_default_branch("trunk");
        let fs = RepoFs::new(Arc::new(BrokenBackend), &record.prefix, Arc::new(CacheLayer::default()));
        let repo = Repository::open(fs);

        let response = list_branches(&repo, &record).await;
        assert!(response.branches.is_empty());
        assert_eq!(response.default_branch, "trunk");
    }
}
