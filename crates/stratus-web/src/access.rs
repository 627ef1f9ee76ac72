//! Requester identity and visibility checks.
//!
//! Authentication happens upstream; the gateway forwards the verified
//! identity in [`REQUESTER_HEADER`].

use crate::{RepoRegistry, WebError};
use axum::http::HeaderMap;
use stratus_types::Repository;

/// Header carrying the authenticated requester.
pub const REQUESTER_HEADER: &str = "x-stratus-user";

/// The requester named by the request headers, if any.
pub fn requester(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(REQUESTER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Looks up a repository the requester may read.
///
/// Hidden repositories fail with [`WebError::Unauthorized`], which renders
/// exactly like a missing one.
pub fn authorize_read(
    registry: &RepoRegistry,
    owner: &str,
    name: &str,
    requester: Option<&str>,
) -> Result<Repository, WebError> {
    let record = registry
        .get(owner, name)
        .ok_or_else(|| WebError::repo_not_found(owner, name))?;
    if !record.is_readable_by(requester) {
        return Err(WebError::repo_hidden(owner, name));
    }
    Ok(record)
}

/// Looks up a repository the requester owns.
pub fn authorize_owner(
    registry: &RepoRegistry,
    owner: &str,
    name: &str,
    requester: Option<&str>,
) -> Result<Repository, WebError> {
    let record = registry
        .get(owner, name)
        .ok_or_else(|| WebError::repo_not_found(owner, name))?;
    if requester != Some(record.owner.as_str()) {
        return Err(WebError::repo_hidden(owner, name));
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::sync::Arc;
    use stratus_storage::MemoryBackend;
    use stratus_types::Visibility;

    async fn registry() -> RepoRegistry {
        let registry = RepoRegistry::new(Arc::new(MemoryBackend::new()));
        registry
            .create(Repository::new("alice", "open", ""))
            .await
            .unwrap();
        registry
            .create(Repository::new("alice", "secret", "").with_visibility(Visibility::Private))
            .await
            .unwrap();
        registry
    }

    #[test]
    fn test_requester_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(requester(&headers), None);
        headers.insert(REQUESTER_HEADER, HeaderValue::from_static("  "));
        assert_eq!(requester(&headers), None);
        headers.insert(REQUESTER_HEADER, HeaderValue::from_static("alice"));
        assert_eq!(requester(&headers), Some("alice"));
    }

    #[tokio::test]
    async fn test_read_access() {
        let registry = registry().await;
        assert!(authorize_read(&registry, "alice", "open", None).is_ok());
        assert!(authorize_read(&registry, "alice", "secret", Some("alice")).is_ok());
        assert!(matches!(
            authorize_read(&registry, "alice", "secret", Some("bob")),
            Err(WebError::Unauthorized(_))
        ));
        assert!(matches!(
            authorize_read(&registry, "alice", "missing", None),
            Err(WebError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_owner_access() {
        let registry = registry().await;
        assert!(authorize_owner(&registry, "alice", "open", Some("alice")).is_ok());
        assert!(authorize_owner(&registry, "alice", "open", None).is_err());
        assert!(authorize_owner(&registry, "alice", "open", Some("bob")).is_err());
    }
}
