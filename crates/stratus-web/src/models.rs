//! API request and response types.

use serde::{Deserialize, Serialize};
use stratus_git::{FileDiff, Hunk, LineKind, LogEntry};
use stratus_types::{Repository as RepoRecord, Visibility};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Repository metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoView {
    /// Owner.
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// `owner/name`.
    pub full_name: String,
    /// Default branch.
    pub default_branch: String,
    /// Visibility.
    pub visibility: Visibility,
    /// Created timestamp (unix millis).
    pub created_at: u64,
    /// True while the repository has no branches.
    pub is_empty: bool,
}

impl RepoView {
    /// Builds the view from a record.
    pub fn new(record: &RepoRecord, is_empty: bool) -> Self {
        Self {
            owner: record.owner.clone(),
            name: record.name.clone(),
            full_name: record.full_name(),
            default_branch: record.default_branch.clone(),
            visibility: record.visibility,
            created_at: record.created_at,
            is_empty,
        }
    }
}

/// Create repository request.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRepoRequest {
    /// Owner; must match the requester.
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// Default branch (`main` when absent).
    pub default_branch: Option<String>,
    /// Visibility (public when absent).
    pub visibility: Option<Visibility>,
}

/// Rename repository request.
#[derive(Debug, Serialize, Deserialize)]
pub struct RenameRequest {
    /// New repository name.
    pub name: String,
}

/// Query for tree and blob reads.
#[derive(Debug, Default, Deserialize)]
pub struct ContentQuery {
    /// Branch name; the default branch when absent.
    pub branch: Option<String>,
    /// Commit id; takes precedence over `branch`.
    pub commit: Option<String>,
    /// Path from the repository root.
    pub path: Option<String>,
}

/// Query for the commit log.
#[derive(Debug, Default, Deserialize)]
pub struct CommitsQuery {
    /// Branch name; the default branch when absent.
    pub branch: Option<String>,
    /// Commits to skip.
    pub skip: Option<usize>,
    /// Page size.
    pub limit: Option<usize>,
}

/// Branch listing.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchesResponse {
    /// Branch names, sorted.
    pub branches: Vec<String>,
    /// Default branch.
    pub default_branch: String,
}

/// One tree entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEntryView {
    /// Entry name.
    pub name: String,
    /// `blob`, `tree` or `commit`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Object id.
    pub oid: String,
    /// Path from the repository root.
    pub path: String,
}

/// Directory listing.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeResponse {
    /// Entries, directories first.
    pub files: Vec<TreeEntryView>,
    /// True when the repository has no commits.
    pub is_empty: bool,
    /// Commit the listing was read from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

impl TreeResponse {
    /// Listing of a repository without commits.
    pub fn empty() -> Self {
        Self {
            files: Vec::new(),
            is_empty: true,
            commit: None,
        }
    }
}

/// File content.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobResponse {
    /// Path from the repository root.
    pub path: String,
    /// Blob id.
    pub oid: String,
    /// Size in bytes.
    pub size: u64,
    /// Binary blobs carry no content.
    pub is_binary: bool,
    /// UTF-8 content of text blobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// One commit in a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitView {
    /// Commit id.
    pub oid: String,
    /// Full message.
    pub message: String,
    /// Author name.
    pub author: String,
    /// Author email.
    pub email: String,
    /// Author time (unix seconds).
    pub timestamp: i64,
}

impl From<&LogEntry> for CommitView {
    fn from(entry: &LogEntry) -> Self {
        Self {
            oid: entry.oid.to_hex(),
            message: entry.commit.message.trim_end().to_string(),
            author: entry.commit.author.name.clone(),
            email: entry.commit.author.email.clone(),
            timestamp: entry.commit.author.timestamp,
        }
    }
}

/// A page of history.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitsResponse {
    /// Commits, newest first.
    pub commits: Vec<CommitView>,
    /// True if another page follows.
    pub has_more: bool,
}

/// One line of a hunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineView {
    /// `context`, `addition` or `deletion`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Line text.
    pub content: String,
}

/// A hunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HunkView {
    /// `@@ -a,b +c,d @@` header.
    pub header: String,
    pub old_start: usize,
    pub old_lines: usize,
    pub new_start: usize,
    pub new_lines: usize,
    /// Hunk lines.
    pub lines: Vec<LineView>,
}

impl From<&Hunk> for HunkView {
    fn from(hunk: &Hunk) -> Self {
        Self {
            header: hunk.header(),
            old_start: hunk.old_start,
            old_lines: hunk.old_lines,
            new_start: hunk.new_start,
            new_lines: hunk.new_lines,
            lines: hunk
                .lines
                .iter()
                .map(|line| LineView {
                    kind: match line.kind {
                        LineKind::Context => "context",
                        LineKind::Addition => "addition",
                        LineKind::Deletion => "deletion",
                    }
                    .to_string(),
                    content: line.content.clone(),
                })
                .collect(),
        }
    }
}

/// A changed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiffView {
    /// Path from the repository root.
    pub path: String,
    /// `added`, `deleted` or `modified`.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_oid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_oid: Option<String>,
    /// Binary files have no hunks.
    pub is_binary: bool,
    pub additions: usize,
    pub deletions: usize,
    /// Line hunks.
    pub hunks: Vec<HunkView>,
}

impl From<&FileDiff> for FileDiffView {
    fn from(file: &FileDiff) -> Self {
        Self {
            path: file.path.clone(),
            status: file.status.as_str().to_string(),
            old_oid: file.old_oid.map(|oid| oid.to_hex()),
            new_oid: file.new_oid.map(|oid| oid.to_hex()),
            is_binary: file.binary,
            additions: file.additions,
            deletions: file.deletions,
            hunks: file.hunks.iter().map(HunkView::from).collect(),
        }
    }
}

/// Totals across a diff.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffStats {
    pub files_changed: usize,
    pub additions: usize,
    pub deletions: usize,
}

/// Changes introduced by a commit.
#[derive(Debug, Serialize, Deserialize)]
pub struct DiffResponse {
    /// Commit id.
    pub commit: String,
    /// First parent, if any.
    pub parent: Option<String>,
    /// Changed files.
    pub files: Vec<FileDiffView>,
    /// Totals.
    pub stats: DiffStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_tree_shape() {
        let value = serde_json::to_value(TreeResponse::empty()).unwrap();
        assert_eq!(value, json!({ "files": [], "isEmpty": true }));
    }

    #[test]
    fn test_binary_blob_has_no_content() {
        let blob = BlobResponse {
            path: "logo.png".into(),
            oid: "ab".repeat(20),
            size: 9000,
            is_binary: true,
            content: None,
        };
        let value = serde_json::to_value(blob).unwrap();
        assert_eq!(value["isBinary"], true);
        assert!(value.get("content").is_none());
    }

    #[test]
    fn test_create_request_defaults() {
        let request: CreateRepoRequest =
            serde_json::from_value(json!({ "owner": "alice", "name": "repo" })).unwrap();
        assert!(request.default_branch.is_none());
        assert!(request.visibility.is_none());

        let request: CreateRepoRequest = serde_json::from_value(json!({
            "owner": "alice",
            "name": "repo",
            "defaultBranch": "trunk",
            "visibility": "private"
        }))
        .unwrap();
        assert_eq!(request.default_branch.as_deref(), Some("trunk"));
        assert_eq!(request.visibility, Some(Visibility::Private));
    }
}
