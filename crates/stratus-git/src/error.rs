//! Git plumbing error types.

use thiserror::Error;

/// Errors that can occur during plumbing operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// An object could not be decoded.
    #[error("invalid object: {0}")]
    InvalidObject(String),

    /// Object not found.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// An object had a different type than the caller required.
    #[error("object {oid} is a {actual}, expected a {expected}")]
    UnexpectedType {
        /// The object id.
        oid: String,
        /// The required type.
        expected: &'static str,
        /// The stored type.
        actual: &'static str,
    },

    /// A reference could not be parsed.
    #[error("invalid reference {name}: {reason}")]
    InvalidRef {
        /// Reference name.
        name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] stratus_storage::StorageError),
}

impl GitError {
    /// Returns true if the error means the requested object does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            GitError::ObjectNotFound(_) => true,
            GitError::Storage(err) => err.is_not_found(),
            _ => false,
        }
    }
}

/// A specialized Result type for plumbing operations.
pub type Result<T> = std::result::Result<T, GitError>;
