//! Stratus web API.
//!
//! JSON endpoints over repositories stored in an object store:
//! - Repository lifecycle (create, info, rename, delete)
//! - Read services: branches, directory listings, file content, history, diffs
//! - Visibility checks against the forwarded requester identity
//! - Cache-Control policies per kind of content

pub mod access;
pub mod cache_headers;
pub mod error;
pub mod models;
pub mod registry;
pub mod routes;
pub mod services;
pub mod state;
pub mod validation;

pub use error::WebError;
pub use registry::RepoRegistry;
pub use routes::create_router;
pub use state::AppState;
