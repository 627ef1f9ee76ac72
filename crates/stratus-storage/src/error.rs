//! Storage error types.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations.
///
/// Paths carried by these errors are repository-relative; object-store keys
/// never appear in them.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested path does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The path contains traversal or encoding that cannot map to a safe key.
    #[error("malformed path: {0}")]
    MalformedPath(String),

    /// The object store could not be reached or rejected the request.
    #[error("object store transport failure: {0}")]
    Transport(String),

    /// An object-store call exceeded its time budget.
    #[error("object store {operation} timed out after {timeout:?}")]
    Timeout {
        /// The backend operation that timed out.
        operation: &'static str,
        /// The budget that was exceeded.
        timeout: Duration,
    },

    /// A chunked delete finished with at least one failed chunk.
    #[error("partial delete: {deleted} keys deleted, {failed} failed: {reason}")]
    PartialDelete {
        /// Keys confirmed deleted.
        deleted: usize,
        /// Keys in chunks that failed.
        failed: usize,
        /// The first chunk failure.
        reason: String,
    },

    /// Stored data could not be interpreted.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl StorageError {
    /// Returns true for the not-found signal the plumbing engine falls back on.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}
