//! Git plumbing for Stratus.
//!
//! A minimal engine that reads and writes bare repositories through the
//! storage adapter's [`stratus_storage::Filesystem`] contract: loose
//! objects, refs (loose, packed and symbolic), history traversal and diffs.
//! Pack files are not read.

mod commit;
pub mod diff;
mod error;
mod object;
pub mod refs;
mod repo;
mod tree;

pub use commit::{Commit, Signature};
pub use diff::{DiffLine, Hunk, LineKind};
pub use error::{GitError, Result};
pub use object::{decode_loose, encode_loose, ObjectId, ObjectSample, ObjectType, RawObject};
pub use repo::{ChangeStatus, CommitDiff, FileDiff, LogEntry, Repository};
pub use tree::{encode_tree, parse_tree, EntryKind, TreeEntry};
