use super::{resolve_commit, Revision};
use crate::models::{CommitView, CommitsQuery, CommitsResponse};
use crate::WebError;
use stratus_git::Repository;
use stratus_storage::Filesystem;
use stratus_types::Repository as RepoRecord;

/// Page size when the request names none.
pub const DEFAULT_PAGE_SIZE: usize = 30;
/// Largest page a request may ask for.
pub const MAX_PAGE_SIZE: usize = 100;

/// Lists history from a branch tip, newest first.
pub async fn list_commits<F: Filesystem>(
    repo: &Repository<F>,
    record: &RepoRecord,
    query: &CommitsQuery,
) -> Result<CommitsResponse, WebError> {
    let skip = query.skip.unwrap_or(0);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let revision = Revision {
        branch: query.branch.as_deref(),
        commit: None,
    };
    let Some(tip) = resolve_commit(repo, record, revision).await? else {
        return Ok(CommitsResponse {
            commits: Vec::new(),
            has_more: false,
        });
    };

    // One extra entry tells whether another page follows.
    let mut entries = repo.log(tip.oid, skip, limit + 1).await?;
    let has_more = entries.len() > limit;
    entries.truncate(limit);

    Ok(CommitsResponse {
        commits: entries.iter().map(CommitView::from).collect(),
        has_more,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{commit, empty_repo};

    fn page(skip: usize, limit: usize) -> CommitsQuery {
        CommitsQuery {
            branch: None,
            skip: Some(skip),
            limit: Some(limit),
        }
    }

    #[tokio::test]
    async fn test_empty_repository_has_no_commits() {
        let (record, repo) = empty_repo().await;
        let response = list_commits(&repo, &record, &CommitsQuery::default()).await.unwrap();
        assert!(response.commits.is_empty());
        assert!(!response.has_more);
    }

    #[tokio::test]
    async fn test_pagination() {
        let (record, repo) = empty_repo().await;
        let mut parent = Vec::new();
        let mut oids = Vec::new();
        for i in 0..5 {
            let content = format!("{}\n", i);
            let oid = commit(&repo, &[("file", &content)], parent, 100 + i, &format!("commit {}", i)).await;
            parent = vec![oid];
            oids.push(oid);
        }

        let first = list_commits(&repo, &record, &page(0, 2)).await.unwrap();
        assert!(first.has_more);
        assert_eq!(first.commits[0].oid, oids[4].to_hex());
        assert_eq!(first.commits[0].message, "commit 4");
        assert_eq!(first.commits[0].author, "Alice");
        assert_eq!(first.commits[0].timestamp, 104);

        let last = list_commits(&repo, &record, &page(4, 2)).await.unwrap();
        assert!(!last.has_more);
        assert_eq!(last.commits.len(), 1);
        assert_eq!(last.commits[0].oid, oids[0].to_hex());
    }

    #[tokio::test]
    async fn test_limit_is_clamped() {
        let (record, repo) = empty_repo().await;
        commit(&repo, &[("file", "x\n")], vec![], 100, "only").await;

        let response = list_commits(&repo, &record, &page(0, 0)).await.unwrap();
        assert_eq!(response.commits.len(), 1);
        let response = list_commits(&repo, &record, &page(0, 10_000)).await.unwrap();
        assert_eq!(response.commits.len(), 1);
    }
}
