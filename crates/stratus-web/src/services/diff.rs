use crate::models::{DiffResponse, DiffStats, FileDiffView};
use crate::validation::validate_oid;
use crate::WebError;
use stratus_git::{ObjectId, Repository};
use stratus_storage::Filesystem;

/// Changes a commit introduced relative to its first parent.
pub async fn commit_diff<F: Filesystem>(repo: &Repository<F>, oid: &str) -> Result<DiffResponse, WebError> {
    validate_oid(oid)?;
    let oid = ObjectId::from_hex(oid)?;
    let diff = repo.diff_commit(oid).await?;

    let files: Vec<FileDiffView> = diff.files.iter().map(FileDiffView::from).collect();
    let stats = DiffStats {
        files_changed: files.len(),
        additions: files.iter().map(|f| f.additions).sum(),
        deletions: files.iter().map(|f| f.deletions).sum(),
    };

    Ok(DiffResponse {
        commit: diff.commit.to_hex(),
        parent: diff.parent.map(|p| p.to_hex()),
        files,
        stats,
    })
}
