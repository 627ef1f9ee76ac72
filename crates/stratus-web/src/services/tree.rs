use super::{path_segments, resolve_commit, walk_tree, Revision};
use crate::models::{ContentQuery, TreeEntryView, TreeResponse};
use crate::WebError;
use stratus_git::Repository;
use stratus_storage::Filesystem;
use stratus_types::Repository as RepoRecord;

/// Lists a directory at a branch tip or commit.
pub async fn read_tree<F: Filesystem>(
    repo: &Repository<F>,
    record: &RepoRecord,
    query: &ContentQuery,
) -> Result<TreeResponse, WebError> {
    let segments = path_segments(query.path.as_deref().unwrap_or(""))?;
    let revision = Revision {
        branch: query.branch.as_deref(),
        commit: query.commit.as_deref(),
    };
    let Some(head) = resolve_commit(repo, record, revision).await? else {
        return Ok(TreeResponse::empty());
    };

    let mut entries = walk_tree(repo, head.commit.tree, &segments).await?;
    entries.sort_by(|a, b| {
        b.is_tree()
            .cmp(&a.is_tree())
            .then_with(|| a.name.as_bytes().cmp(b.name.as_bytes()))
    });

    let base = segments.join("/");
    let files = entries
        .into_iter()
        .map(|entry| TreeEntryView {
            path: if base.is_empty() {
                entry.name.clone()
            } else {
                format!("{}/{}", base, entry.name)
            },
            kind: entry.kind().as_str().to_string(),
            oid: entry.oid.to_hex(),
            name: entry.name,
        })
        .collect();

    Ok(TreeResponse {
        files,
        is_empty: false,
        commit: Some(head.oid.to_hex()),
    })
}
