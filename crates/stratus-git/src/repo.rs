//! A bare repository read and written through a [`Filesystem`].

use crate::commit::Commit;
use crate::diff::{self, Hunk, CONTEXT_LINES};
use crate::object::{self, ObjectSample, RawObject};
use crate::refs::{self, Reference, HEADS};
use crate::tree::{self, EntryKind, TreeEntry};
use crate::{GitError, ObjectId, ObjectType, Result};
use bytes::Bytes;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashSet};
use stratus_storage::Filesystem;
use tracing::{debug, warn};

/// Directories created for a fresh bare repository.
const SKELETON_DIRS: &[&str] = &["objects/info", "objects/pack", "refs/heads", "refs/tags"];

/// One commit yielded by [`Repository::log`].
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Commit id.
    pub oid: ObjectId,
    /// Decoded commit.
    pub commit: Commit,
}

/// How a path changed between two trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    /// Only in the new tree.
    Added,
    /// Only in the old tree.
    Deleted,
    /// In both, with different content or mode.
    Modified,
}

impl ChangeStatus {
    /// Lowercase name used in API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::Added => "added",
            ChangeStatus::Deleted => "deleted",
            ChangeStatus::Modified => "modified",
        }
    }
}

/// A changed file with its line-level hunks.
#[derive(Debug, Clone)]
pub struct FileDiff {
    /// Full path from the repository root.
    pub path: String,
    /// Change kind.
    pub status: ChangeStatus,
    /// Old blob, if any.
    pub old_oid: Option<ObjectId>,
    /// New blob, if any.
    pub new_oid: Option<ObjectId>,
    /// Either side is binary; no hunks are produced.
    pub binary: bool,
    /// Line hunks.
    pub hunks: Vec<Hunk>,
    /// Added lines.
    pub additions: usize,
    /// Deleted lines.
    pub deletions: usize,
}

/// The changes a commit introduced relative to its first parent.
#[derive(Debug, Clone)]
pub struct CommitDiff {
    /// The commit.
    pub commit: ObjectId,
    /// First parent, if the commit has one.
    pub parent: Option<ObjectId>,
    /// Changed files sorted by path.
    pub files: Vec<FileDiff>,
}

#[derive(Debug, Clone)]
struct Change {
    path: String,
    status: ChangeStatus,
    old: Option<TreeEntry>,
    new: Option<TreeEntry>,
}

/// Commit queued for traversal, ordered newest first then by lowest oid.
struct Queued {
    time: i64,
    oid: ObjectId,
    commit: Commit,
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| other.oid.cmp(&self.oid))
    }
}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

/// A bare git repository.
pub struct Repository<F> {
    fs: F,
}

impl<F: Filesystem> Repository<F> {
    /// Opens an existing repository.
    pub fn open(fs: F) -> Self {
        Self { fs }
    }

    /// Lays out a new bare repository whose `HEAD` names `default_branch`.
    pub async fn init(fs: F, default_branch: &str) -> Result<Self> {
        refs::write_symbolic(&fs, "HEAD", &format!("{}{}", HEADS, default_branch)).await?;
        fs.write(
            "config",
            Bytes::from_static(
                b"[core]\n\trepositoryformatversion = 0\n\tfilemode = true\n\tbare = true\n",
            ),
        )
        .await?;
        fs.write(
            "description",
            Bytes::from_static(b"Unnamed repository; edit this file 'description' to name the repository.\n"),
        )
        .await?;
        for dir in SKELETON_DIRS {
            fs.mkdir(dir).await?;
        }
        debug!(default_branch, "Initialized bare repository");
        Ok(Self { fs })
    }

    /// The underlying filesystem.
    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// Branch named by `HEAD`, if it is symbolic.
    pub async fn head_branch(&self) -> Result<Option<String>> {
        match refs::read_reference(&self.fs, "HEAD").await? {
            Some(Reference::Symbolic(target)) => {
                Ok(target.strip_prefix(HEADS).map(str::to_string))
            }
            _ => Ok(None),
        }
    }

    /// All branch names, sorted.
    pub async fn list_branches(&self) -> Result<Vec<String>> {
        refs::list_branches(&self.fs).await
    }

    /// Tip of a branch; `None` if the branch does not exist.
    pub async fn resolve_branch(&self, branch: &str) -> Result<Option<ObjectId>> {
        refs::resolve(&self.fs, &format!("{}{}", HEADS, branch)).await
    }

    /// Points a branch at a commit.
    pub async fn update_ref(&self, branch: &str, target: ObjectId) -> Result<()> {
        refs::write_reference(&self.fs, &format!("{}{}", HEADS, branch), target).await
    }

    /// Reads and verifies a loose object.
    pub async fn read_object(&self, oid: ObjectId) -> Result<RawObject> {
        let compressed = match self.fs.read(&oid.loose_path()).await {
            Ok(data) => data,
            Err(err) if err.is_not_found() => return Err(GitError::ObjectNotFound(oid.to_hex())),
            Err(err) => return Err(err.into()),
        };
        let object = object::decode_loose(&compressed)?;
        if object.id != oid {
            return Err(GitError::InvalidObject(format!(
                "{} hashes to {}",
                oid, object.id
            )));
        }
        Ok(object)
    }

    async fn read_typed(&self, oid: ObjectId, expected: ObjectType) -> Result<RawObject> {
        let object = self.read_object(oid).await?;
        if object.object_type != expected {
            return Err(GitError::UnexpectedType {
                oid: oid.to_hex(),
                expected: expected.as_str(),
                actual: object.object_type.as_str(),
            });
        }
        Ok(object)
    }

    /// Reads a commit.
    pub async fn read_commit(&self, oid: ObjectId) -> Result<Commit> {
        let object = self.read_typed(oid, ObjectType::Commit).await?;
        Commit::parse(&object.data)
    }

    /// Reads a tree's entries.
    pub async fn read_tree(&self, oid: ObjectId) -> Result<Vec<TreeEntry>> {
        let object = self.read_typed(oid, ObjectType::Tree).await?;
        tree::parse_tree(&object.data)
    }

    /// Reads a blob's content.
    pub async fn read_blob(&self, oid: ObjectId) -> Result<Bytes> {
        Ok(self.read_typed(oid, ObjectType::Blob).await?.data)
    }

    /// Size and leading bytes of a blob, inflating no more than `max` bytes.
    pub async fn blob_sample(&self, oid: ObjectId, max: usize) -> Result<ObjectSample> {
        let compressed = match self.fs.read(&oid.loose_path()).await {
            Ok(data) => data,
            Err(err) if err.is_not_found() => return Err(GitError::ObjectNotFound(oid.to_hex())),
            Err(err) => return Err(err.into()),
        };
        let sample = object::sample_loose(&compressed, max)?;
        if sample.object_type != ObjectType::Blob {
            return Err(GitError::UnexpectedType {
                oid: oid.to_hex(),
                expected: ObjectType::Blob.as_str(),
                actual: sample.object_type.as_str(),
            });
        }
        Ok(sample)
    }

    /// Stores an object and returns its id.
    pub async fn write_object(&self, object_type: ObjectType, data: impl Into<Bytes>) -> Result<ObjectId> {
        let object = RawObject::new(object_type, data);
        let compressed = object::encode_loose(&object)?;
        self.fs
            .write(&object.id.loose_path(), Bytes::from(compressed))
            .await?;
        Ok(object.id)
    }

    /// Stores a blob.
    pub async fn write_blob(&self, content: impl Into<Bytes>) -> Result<ObjectId> {
        self.write_object(ObjectType::Blob, content).await
    }

    /// Stores a tree.
    pub async fn write_tree(&self, entries: &[TreeEntry]) -> Result<ObjectId> {
        self.write_object(ObjectType::Tree, tree::encode_tree(entries)).await
    }

    /// Stores a commit.
    pub async fn write_commit(&self, commit: &Commit) -> Result<ObjectId> {
        self.write_object(ObjectType::Commit, commit.encode()).await
    }

    /// Walks history from `tip`, newest commit time first.
    ///
    /// Commits with equal times are ordered by oid, so pages cut with
    /// `skip`/`limit` are stable. Unreachable parents (shallow history) end
    /// their line of descent.
    pub async fn log(&self, tip: ObjectId, skip: usize, limit: usize) -> Result<Vec<LogEntry>> {
        let mut out = Vec::new();
        if limit == 0 {
            return Ok(out);
        }

        let mut seen = HashSet::from([tip]);
        let mut queue = BinaryHeap::new();
        let commit = self.read_commit(tip).await?;
        queue.push(Queued {
            time: commit.committer.timestamp,
            oid: tip,
            commit,
        });

        let mut skipped = 0;
        while let Some(Queued { oid, commit, .. }) = queue.pop() {
            for parent in &commit.parents {
                if !seen.insert(*parent) {
                    continue;
                }
                match self.read_commit(*parent).await {
                    Ok(parent_commit) => queue.push(Queued {
                        time: parent_commit.committer.timestamp,
                        oid: *parent,
                        commit: parent_commit,
                    }),
                    Err(err) if err.is_not_found() => {
                        warn!(commit = %oid, parent = %parent, "Parent commit missing");
                    }
                    Err(err) => return Err(err),
                }
            }

            if skipped < skip {
                skipped += 1;
                continue;
            }
            out.push(LogEntry { oid, commit });
            if out.len() == limit {
                break;
            }
        }
        Ok(out)
    }

    /// Changes between two trees, either of which may be absent.
    async fn diff_trees(&self, old: Option<ObjectId>, new: Option<ObjectId>) -> Result<Vec<Change>> {
        let mut changes = Vec::new();
        let mut pending = vec![(String::new(), old, new)];

        while let Some((base, old, new)) = pending.pop() {
            let old_entries = match old {
                Some(oid) => self.read_tree(oid).await?,
                None => Vec::new(),
            };
            let new_entries = match new {
                Some(oid) => self.read_tree(oid).await?,
                None => Vec::new(),
            };

            let mut sides: BTreeMap<String, (Option<TreeEntry>, Option<TreeEntry>)> = BTreeMap::new();
            for entry in old_entries {
                let name = entry.name.clone();
                sides.entry(name).or_default().0 = Some(entry);
            }
            for entry in new_entries {
                let name = entry.name.clone();
                sides.entry(name).or_default().1 = Some(entry);
            }

            for (name, (old, new)) in sides {
                if let (Some(o), Some(n)) = (&old, &new) {
                    if o.oid == n.oid && o.mode == n.mode {
                        continue;
                    }
                }
                let path = if base.is_empty() {
                    name
                } else {
                    format!("{}/{}", base, name)
                };

                let old_tree = old.as_ref().filter(|e| e.is_tree()).map(|e| e.oid);
                let new_tree = new.as_ref().filter(|e| e.is_tree()).map(|e| e.oid);
                if old_tree.is_some() || new_tree.is_some() {
                    pending.push((path.clone(), old_tree, new_tree));
                }

                let old_file = old.filter(|e| !e.is_tree());
                let new_file = new.filter(|e| !e.is_tree());
                let status = match (&old_file, &new_file) {
                    (Some(_), Some(_)) => ChangeStatus::Modified,
                    (Some(_), None) => ChangeStatus::Deleted,
                    (None, Some(_)) => ChangeStatus::Added,
                    (None, None) => continue,
                };
                changes.push(Change {
                    path,
                    status,
                    old: old_file,
                    new: new_file,
                });
            }
        }

        changes.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(changes)
    }

    async fn side_content(&self, entry: Option<&TreeEntry>) -> Result<Option<Bytes>> {
        match entry {
            Some(entry) if entry.kind() == EntryKind::Blob => Ok(Some(self.read_blob(entry.oid).await?)),
            _ => Ok(None),
        }
    }

    /// Diffs a commit against its first parent, or the empty tree for a root.
    pub async fn diff_commit(&self, oid: ObjectId) -> Result<CommitDiff> {
        let commit = self.read_commit(oid).await?;
        let parent = commit.parents.first().copied();
        let parent_tree = match parent {
            Some(parent) => Some(self.read_commit(parent).await?.tree),
            None => None,
        };

        let changes = self.diff_trees(parent_tree, Some(commit.tree)).await?;
        let mut files = Vec::with_capacity(changes.len());
        for change in changes {
            let old = self.side_content(change.old.as_ref()).await?;
            let new = self.side_content(change.new.as_ref()).await?;

            let binary = old.as_deref().is_some_and(diff::is_binary)
                || new.as_deref().is_some_and(diff::is_binary);
            let hunks = if binary {
                Vec::new()
            } else {
                let old_text = old.as_deref().map(String::from_utf8_lossy).unwrap_or_default();
                let new_text = new.as_deref().map(String::from_utf8_lossy).unwrap_or_default();
                diff::diff_lines(&old_text, &new_text, CONTEXT_LINES)
            };
            let (additions, deletions) = diff::line_stats(&hunks);

            files.push(FileDiff {
                path: change.path,
                status: change.status,
                old_oid: change.old.map(|e| e.oid),
                new_oid: change.new.map(|e| e.oid),
                binary,
                hunks,
                additions,
                deletions,
            });
        }

        Ok(CommitDiff {
            commit: oid,
            parent,
            files,
        })
    }
}
