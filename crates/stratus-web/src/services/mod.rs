//! Read services and repository lifecycle.
//!
//! Each service works on an opened [`stratus_git::Repository`] and returns
//! API views. None of them check visibility; the routes do that before a
//! repository is opened.

mod blob;
mod branches;
mod commits;
mod diff;
mod lifecycle;
mod tree;

pub use blob::read_blob;
pub use branches::list_branches;
pub use commits::{list_commits, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use diff::commit_diff;
pub use lifecycle::{
    create_repository, delete_repository, rename_repository, repository_info, DEFAULT_BRANCH,
};
pub use tree::read_tree;

use crate::validation::{validate_branch, validate_oid, validate_tree_path};
use crate::WebError;
use stratus_git::{LogEntry, ObjectId, Repository, TreeEntry};
use stratus_storage::Filesystem;
use stratus_types::Repository as RepoRecord;

/// Where a read starts: an explicit commit or a branch tip.
pub(crate) struct Revision<'a> {
    pub branch: Option<&'a str>,
    pub commit: Option<&'a str>,
}

/// Resolves the commit a read is served from.
///
/// `Ok(None)` means the repository has no commits yet. A named branch that
/// does not exist in a non-empty repository is NotFound.
pub(crate) async fn resolve_commit<F: Filesystem>(
    repo: &Repository<F>,
    record: &RepoRecord,
    revision: Revision<'_>,
) -> Result<Option<LogEntry>, WebError> {
    if let Some(commit) = revision.commit {
        validate_oid(commit)?;
        let oid = ObjectId::from_hex(commit)?;
        let commit = repo.read_commit(oid).await?;
        return Ok(Some(LogEntry { oid, commit }));
    }

    let branch = revision.branch.unwrap_or(record.default_branch.as_str());
    validate_branch(branch)?;
    match repo.resolve_branch(branch).await? {
        Some(tip) => Ok(repo.log(tip, 0, 1).await?.into_iter().next()),
        None if repo.list_branches().await?.is_empty() => Ok(None),
        None => Err(WebError::NotFound(format!("branch '{}' not found", branch))),
    }
}

/// Splits a validated tree path into segments.
pub(crate) fn path_segments(path: &str) -> Result<Vec<&str>, WebError> {
    validate_tree_path(path)?;
    Ok(path
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect())
}

/// Descends from `root` through `segments`, each of which must be a subtree.
///
/// Fails NotFound naming the path up to the first segment that is missing or
/// not a directory.
pub(crate) async fn walk_tree<F: Filesystem>(
    repo: &Repository<F>,
    root: ObjectId,
    segments: &[&str],
) -> Result<Vec<TreeEntry>, WebError> {
    let mut entries = repo.read_tree(root).await?;
    for (depth, segment) in segments.iter().enumerate() {
        let subtree = entries
            .iter()
            .find(|entry| entry.name == *segment && entry.is_tree())
            .map(|entry| entry.oid);
        match subtree {
            Some(oid) => entries = repo.read_tree(oid).await?,
            None => {
                return Err(WebError::NotFound(format!(
                    "path '{}' not found",
                    segments[..=depth].join("/")
                )))
            }
        }
    }
    Ok(entries)
}

#[cfg(test)]
pub(crate) mod testing {
    use bytes::Bytes;
    use std::sync::Arc;
    use stratus_git::{Commit, ObjectId, Repository, Signature, TreeEntry};
    use stratus_storage::{CacheLayer, MemoryBackend, RepoFs};
    use stratus_types::Repository as RepoRecord;

    pub async fn empty_repo() -> (RepoRecord, Repository<RepoFs>) {
        let record = RepoRecord::new("alice", "repo", "repos/service-test");
        let fs = RepoFs::new(
            Arc::new(MemoryBackend::new()),
            &record.prefix,
            Arc::new(CacheLayer::default()),
        );
        let repo = Repository::init(fs, "main").await.unwrap();
        (record, repo)
    }

    /// Writes a tree for `files` (paths may contain `/`) and returns its id.
    pub async fn write_files(repo: &Repository<RepoFs>, files: &[(&str, &str)]) -> ObjectId {
        let mut root: Vec<TreeEntry> = Vec::new();
        let mut dirs: std::collections::BTreeMap<&str, Vec<(&str, &str)>> = Default::default();
        for (path, content) in files {
            match path.split_once('/') {
                Some((dir, rest)) => dirs.entry(dir).or_default().push((rest, *content)),
                None => {
                    let blob = repo
                        .write_blob(Bytes::copy_from_slice(content.as_bytes()))
                        .await
                        .unwrap();
                    root.push(TreeEntry::new("100644", *path, blob));
                }
            }
        }
        for (dir, children) in dirs {
            let sub = Box::pin(write_files(repo, &children)).await;
            root.push(TreeEntry::new("40000", dir, sub));
        }
        repo.write_tree(&root).await.unwrap()
    }

    pub async fn commit(
        repo: &Repository<RepoFs>,
        files: &[(&str, &str)],
        parents: Vec<ObjectId>,
        time: i64,
        message: &str,
    ) -> ObjectId {
        let tree = write_files(repo, files).await;
        let sig = Signature::new("Alice", "alice@example.com", time);
        let oid = repo
            .write_commit(&Commit {
                tree,
                parents,
                author: sig.clone(),
                committer: sig,
                message: format!("{}\n", message),
            })
            .await
            .unwrap();
        repo.update_ref("main", oid).await.unwrap();
        oid
    }
}
