use super::{path_segments, resolve_commit, walk_tree, Revision};
use crate::models::{BlobResponse, ContentQuery};
use crate::WebError;
use stratus_git::diff::{is_binary, BINARY_SNIFF_LEN};
use stratus_git::{EntryKind, Repository};
use stratus_storage::Filesystem;
use stratus_types::Repository as RepoRecord;
use tracing::debug;

/// Reads a file at a branch tip or commit.
///
/// Only the first [`BINARY_SNIFF_LEN`] bytes are inflated to classify the
/// blob; binary blobs are returned without content.
pub async fn read_blob<F: Filesystem>(
    repo: &Repository<F>,
    record: &RepoRecord,
    query: &ContentQuery,
) -> Result<BlobResponse, WebError> {
    let path = query.path.as_deref().unwrap_or("");
    let segments = path_segments(path)?;
    let Some((file_name, dirs)) = segments.split_last() else {
        return Err(WebError::BadRequest("path is required".to_string()));
    };
    let full_path = segments.join("/");

    let revision = Revision {
        branch: query.branch.as_deref(),
        commit: query.commit.as_deref(),
    };
    let Some(head) = resolve_commit(repo, record, revision).await? else {
        return Err(WebError::NotFound(format!("path '{}' not found", full_path)));
    };

    let entries = walk_tree(repo, head.commit.tree, dirs).await?;
    let oid = entries
        .iter()
        .find(|entry| entry.name == *file_name && entry.kind() == EntryKind::Blob)
        .map(|entry| entry.oid)
        .ok_or_else(|| WebError::NotFound(format!("path '{}' not found", full_path)))?;

    let sample = repo.blob_sample(oid, BINARY_SNIFF_LEN).await?;
    if is_binary(&sample.head) {
        debug!(repo = %record.full_name(), path = %full_path, size = sample.size, "Binary blob");
        return Ok(BlobResponse {
            path: full_path,
            oid: oid.to_hex(),
            size: sample.size,
            is_binary: true,
            content: None,
        });
    }

    let data = if sample.head.len() as u64 == sample.size {
        sample.head
    } else {
        repo.read_blob(oid).await?
    };
    Ok(BlobResponse {
        path: full_path,
        oid: oid.to_hex(),
        size: sample.size,
        is_binary: false,
        content: Some(String::from_utf8_lossy(&data).into_owned()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{commit, empty_repo};

    fn query(path: &str) -> ContentQuery {
        ContentQuery {
            path: Some(path.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_text_blob() {
        let (record, repo) = empty_repo().await;
        commit(&repo, &[("src/main.rs", "fn main() {}\n")], vec![], 100, "init").await;

        let blob = read_blob(&repo, &record, &query("src/main.rs")).await.unwrap();
        assert!(!blob.is_binary);
        assert_eq!(blob.content.as_deref(), Some("fn main() {}\n"));
        assert_eq!(blob.size, 13);
        assert_eq!(blob.path, "src/main.rs");
    }

    #[tokio::test]
    async fn test_large_text_blob_is_read_in_full() {
        let (record, repo) = empty_repo().await;
        let content = "line\n".repeat(4000);
        commit(&repo, &[("big.txt", &content)], vec![], 100, "init").await;

        let blob = read_blob(&repo, &record, &query("big.txt")).await.unwrap();
        assert_eq!(blob.content.as_deref(), Some(content.as_str()));
    }

    #[tokio::test]
    async fn test_nul_within_sniff_window_is_binary() {
        let (record, repo) = empty_repo().await;
        let mut content = "a".repeat(20_000);
        content.replace_range(500..501, "\0");
        commit(&repo, &[("data.bin", &content)], vec![], 100, "init").await;

        let blob = read_blob(&repo, &record, &query("data.bin")).await.unwrap();
        assert!(blob.is_binary);
        assert!(blob.content.is_none());
        assert_eq!(blob.size, 20_000);
    }

    #[tokio::test]
    async fn test_nul_after_sniff_window_is_text() {
        let (record, repo) = empty_repo().await;
        let mut content = "a".repeat(9_000);
        content.replace_range(8_500..8_501, "\0");
        commit(&repo, &[("late.txt", &content)], vec![], 100, "init").await;

        let blob = read_blob(&repo, &record, &query("late.txt")).await.unwrap();
        assert!(!blob.is_binary);
    }

    #[tokio::test]
    async fn test_missing_intermediate_directory() {
        let (record, repo) = empty_repo().await;
        commit(&repo, &[("a/x.txt", "x\n")], vec![], 100, "init").await;

        let err = read_blob(&repo, &record, &query("a/b/c.txt")).await.unwrap_err();
        assert!(matches!(err, WebError::NotFound(ref msg) if msg == "path 'a/b' not found"));
    }

    #[tokio::test]
    async fn test_directory_is_not_a_blob() {
        let (record, repo) = empty_repo().await;
        commit(&repo, &[("a/x.txt", "x\n")], vec![], 100, "init").await;

        let err = read_blob(&repo, &record, &query("a")).await.unwrap_err();
        assert!(matches!(err, WebError::NotFound(_)));
        let err = read_blob(&repo, &record, &query("")).await.unwrap_err();
        assert!(matches!(err, WebError::BadRequest(_)));
    }
}
