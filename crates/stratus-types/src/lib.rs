//! Common types used throughout `stratus`.
//!
//! Repository records, identifiers and visibility shared by the storage,
//! web and node crates.

mod repository;

pub use repository::{Repository, RepositoryId, Visibility, PREFIX_ROOT};
