use crate::access::authorize_owner;
use crate::models::{CreateRepoRequest, RepoView};
use crate::validation::{validate_branch, validate_name};
use crate::{AppState, WebError};
use stratus_git::Repository;
use stratus_storage::Filesystem;
use stratus_types::Repository as RepoRecord;
use tracing::{error, info, warn};

/// Default branch of new repositories.
pub const DEFAULT_BRANCH: &str = "main";

/// Registers a repository and lays out an empty bare repository at its prefix.
pub async fn create_repository(
    state: &AppState,
    requester: Option<&str>,
    request: CreateRepoRequest,
) -> Result<RepoView, WebError> {
    validate_name("owner", &request.owner)?;
    validate_name("name", &request.name)?;
    let default_branch = request
        .default_branch
        .unwrap_or_else(|| DEFAULT_BRANCH.to_string());
    validate_branch(&default_branch)?;
    if requester != Some(request.owner.as_str()) {
        return Err(WebError::Forbidden(format!(
            "cannot create repositories for '{}'",
            request.owner
        )));
    }

    let record = RepoRecord::new(request.owner, request.name, "")
        .with_default_branch(default_branch)
        .with_visibility(request.visibility.unwrap_or_default());
    let record = state.registry.create(record).await?;

    if let Err(err) = Repository::init(state.filesystem(&record), &record.default_branch).await {
        error!(repo = %record.full_name(), error = %err, "Failed to initialize repository");
        if let Err(cleanup) = state.filesystem(&record).remove_subtree("").await {
            warn!(repo = %record.full_name(), error = %cleanup, "Failed to clean up repository data");
        }
        if let Err(cleanup) = state.registry.remove(&record.owner, &record.name).await {
            warn!(repo = %record.full_name(), error = %cleanup, "Failed to unregister repository");
        }
        return Err(err.into());
    }

    info!(repo = %record.full_name(), visibility = ?record.visibility, "Created repository");
    Ok(RepoView::new(&record, true))
}

/// Deletes every object under the repository's prefix, then its record.
///
/// A partial delete keeps the record so the delete can be retried.
pub async fn delete_repository(
    state: &AppState,
    requester: Option<&str>,
    owner: &str,
    name: &str,
) -> Result<(), WebError> {
    let record = authorize_owner(&state.registry, owner, name, requester)?;
    let report = state.filesystem(&record).remove_subtree("").await?;
    state.registry.remove(owner, name).await?;
    info!(
        repo = %record.full_name(),
        deleted = report.deleted,
        batches = report.batches,
        "Deleted repository"
    );
    Ok(())
}

/// Renames a repository; its data stays under the same prefix.
pub async fn rename_repository(
    state: &AppState,
    requester: Option<&str>,
    owner: &str,
    name: &str,
    new_name: &str,
) -> Result<RepoView, WebError> {
    validate_name("name", new_name)?;
    authorize_owner(&state.registry, owner, name, requester)?;
    let record = state.registry.rename(owner, name, new_name).await?;
    repository_info(&state.open(&record), &record).await
}

/// Record metadata plus whether the repository has any branches.
pub async fn repository_info<F: Filesystem>(
    repo: &Repository<F>,
    record: &RepoRecord,
) -> Result<RepoView, WebError> {
    let is_empty = repo.list_branches().await?.is_empty();
    Ok(RepoView::new(record, is_empty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RepoRegistry;
    use std::sync::Arc;
    use stratus_storage::{CacheLayer, MemoryBackend, StoreBackend};
    use stratus_types::Visibility;

    fn state() -> (Arc<MemoryBackend>, AppState) {
        let backend = Arc::new(MemoryBackend::new());
        let state = AppState::new(
            Arc::new(RepoRegistry::new(backend.clone())),
            backend.clone(),
            Arc::new(CacheLayer::default()),
        );
        (backend, state)
    }

    fn request(owner: &str, name: &str) -> CreateRepoRequest {
        CreateRepoRequest {
            owner: owner.to_string(),
            name: name.to_string(),
            default_branch: None,
            visibility: None,
        }
    }

    #[tokio::test]
    async fn test_create_initializes_bare_repository() {
        let (backend, state) = state();
        let view = create_repository(&state, Some("alice"), request("alice", "repo"))
            .await
            .unwrap();
        assert!(view.is_empty);
        assert_eq!(view.default_branch, "main");
        assert_eq!(view.visibility, Visibility::Public);

        let record = state.registry.get("alice", "repo").unwrap();
        let head = backend.get(&format!("{}/HEAD", record.prefix)).await.unwrap().unwrap();
        assert_eq!(&head[..], b"ref: refs/heads/main\n");
    }

    #[tokio::test]
    async fn test_create_for_someone_else_is_forbidden() {
        let (_, state) = state();
        let err = create_repository(&state, Some("bob"), request("alice", "repo"))
            .await
            .unwrap_err();
        assert!(matches!(err, WebError::Forbidden(_)));
        assert!(state.registry.is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_data_and_record() {
        let (backend, state) = state();
        create_repository(&state, Some("alice"), request("alice", "repo")).await.unwrap();
        assert!(!backend.is_empty());

        delete_repository(&state, Some("alice"), "alice", "repo").await.unwrap();
        assert!(backend.is_empty());
        assert!(state.registry.get("alice", "repo").is_none());
    }

    #[tokio::test]
    async fn test_delete_requires_owner() {
        let (_, state) = state();
        create_repository(&state, Some("alice"), request("alice", "repo")).await.unwrap();
        let err = delete_repository(&state, Some("bob"), "alice", "repo").await.unwrap_err();
        assert!(matches!(err, WebError::Unauthorized(_)));
        assert!(state.registry.get("alice", "repo").is_some());
    }

    #[tokio::test]
    async fn test_rename_keeps_data() {
        let (_, state) = state();
        create_repository(&state, Some("alice"), request("alice", "old")).await.unwrap();
        let before = state.registry.get("alice", "old").unwrap();

        let view = rename_repository(&state, Some("alice"), "alice", "old", "new").await.unwrap();
        assert_eq!(view.name, "new");
        let after = state.registry.get("alice", "new").unwrap();
        assert_eq!(after.prefix, before.prefix);
        let repo = state.open(&after);
        assert_eq!(repo.head_branch().await.unwrap(), Some("main".to_string()));
    }
}
