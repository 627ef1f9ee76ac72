//! Object-store adapter for Stratus.
//!
//! This crate maps bare git repositories onto a flat object store: the key
//! scheme, the backend contract with its concrete stores, a filesystem
//! adapter for the plumbing engine, and the read-through caches in front of
//! it all.

pub mod backend;
pub mod cache;
pub mod cloud;
mod error;
pub mod fs;
pub mod key;

pub use backend::{
    BackendStats, MemoryBackend, ObjectMeta, StoreBackend, TimeoutBackend, DELETE_BATCH_SIZE,
};
pub use cache::{CacheConfig, CacheLayer, CachePolicy, CacheStats, TtlCache};
pub use cloud::CloudBackend;
pub use error::StorageError;
pub use fs::{DeleteReport, Filesystem, Metadata, RepoFs};
pub use key::{to_key, validate_relative_path};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
