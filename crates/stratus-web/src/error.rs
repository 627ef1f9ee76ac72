//! Error types for the HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use stratus_git::GitError;
use stratus_storage::StorageError;
use thiserror::Error;

/// API errors.
#[derive(Debug, Error)]
pub enum WebError {
    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A repository the requester may not see. Rendered exactly like
    /// [`WebError::NotFound`] so private repositories are not revealed.
    #[error("not found: {0}")]
    Unauthorized(String),

    /// The requester may not perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Malformed input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The object store failed.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// The object store did not answer in time.
    #[error("upstream timeout: {0}")]
    UpstreamTimeout(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WebError {
    /// Not-found error for a repository.
    pub fn repo_not_found(owner: &str, name: &str) -> Self {
        WebError::NotFound(repo_message(owner, name))
    }

    /// Hidden repository error, indistinguishable from a missing one.
    pub fn repo_hidden(owner: &str, name: &str) -> Self {
        WebError::Unauthorized(repo_message(owner, name))
    }

    /// Logs server-side failures with the repository and path they concern.
    ///
    /// Client errors pass through silently; their message is the response.
    pub fn logged(self, repo: &str, path: &str) -> Self {
        match &self {
            WebError::Upstream(detail) => {
                tracing::warn!(repo = %repo, path = %path, error = %detail, "Object store failure");
            }
            WebError::UpstreamTimeout(detail) => {
                tracing::warn!(repo = %repo, path = %path, error = %detail, "Object store timeout");
            }
            WebError::Internal(detail) => {
                tracing::error!(repo = %repo, path = %path, error = %detail, "Internal error");
            }
            _ => {}
        }
        self
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::NotFound(_) | WebError::Unauthorized(_) => StatusCode::NOT_FOUND,
            WebError::Forbidden(_) => StatusCode::FORBIDDEN,
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebError::Conflict(_) => StatusCode::CONFLICT,
            WebError::Upstream(_) => StatusCode::BAD_GATEWAY,
            WebError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            WebError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn repo_message(owner: &str, name: &str) -> String {
    format!("repository '{}/{}' not found", owner, name)
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            WebError::NotFound(msg) | WebError::Unauthorized(msg) => msg,
            WebError::Forbidden(msg) | WebError::BadRequest(msg) | WebError::Conflict(msg) => msg,
            WebError::Upstream(_) => "object store unavailable".to_string(),
            WebError::UpstreamTimeout(_) => "object store timed out".to_string(),
            WebError::Internal(_) => "internal server error".to_string(),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<StorageError> for WebError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(path) => WebError::NotFound(format!("path '{}' not found", path)),
            StorageError::MalformedPath(reason) => WebError::BadRequest(reason),
            StorageError::Timeout { .. } => WebError::UpstreamTimeout(err.to_string()),
            StorageError::Transport(_) | StorageError::PartialDelete { .. } => {
                WebError::Upstream(err.to_string())
            }
            StorageError::InvalidData(_) => WebError::Internal(err.to_string()),
        }
    }
}

impl From<GitError> for WebError {
    fn from(err: GitError) -> Self {
        match err {
            GitError::ObjectNotFound(oid) => WebError::NotFound(format!("object '{}' not found", oid)),
            GitError::Storage(err) => err.into(),
            other => WebError::Internal(other.to_string()),
        }
    }
}
