//! Reference resolution over the storage adapter.
//!
//! Loose refs win over `packed-refs`; `HEAD` is normally symbolic.

use crate::{GitError, ObjectId, Result};
use bytes::Bytes;
use std::collections::BTreeMap;
use stratus_storage::{Filesystem, StorageError};

/// Prefix of branch refs.
pub const HEADS: &str = "refs/heads/";

/// Maximum symbolic hops before a ref is considered cyclic.
const MAX_SYMREF_DEPTH: usize = 5;

/// A git reference (branch, tag, or symbolic ref).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// Direct reference to an object.
    Direct(ObjectId),
    /// Symbolic reference (e.g., HEAD -> refs/heads/main).
    Symbolic(String),
}

impl Reference {
    /// Parses the content of a loose ref file.
    pub fn parse(name: &str, content: &str) -> Result<Self> {
        let content = content.trim();
        if let Some(target) = content.strip_prefix("ref:") {
            return Ok(Self::Symbolic(target.trim().to_string()));
        }
        ObjectId::from_hex(content)
            .map(Self::Direct)
            .map_err(|_| GitError::InvalidRef {
                name: name.to_string(),
                reason: format!("unparseable content {:?}", content),
            })
    }

    /// Returns the object ID if this is a direct reference.
    pub fn as_direct(&self) -> Option<ObjectId> {
        match self {
            Self::Direct(id) => Some(*id),
            Self::Symbolic(_) => None,
        }
    }

    fn encode(&self) -> String {
        match self {
            Self::Direct(id) => format!("{}\n", id),
            Self::Symbolic(target) => format!("ref: {}\n", target),
        }
    }
}

/// Reads `packed-refs`; a missing file is an empty set.
pub async fn packed_refs<F: Filesystem + ?Sized>(fs: &F) -> Result<BTreeMap<String, ObjectId>> {
    let content = match fs.read_to_string("packed-refs").await {
        Ok(content) => content,
        Err(err) if err.is_not_found() => return Ok(BTreeMap::new()),
        Err(err) => return Err(err.into()),
    };

    let mut refs = BTreeMap::new();
    for line in content.lines() {
        // Header comments and peeled tag lines.
        if line.starts_with('#') || line.starts_with('^') || line.trim().is_empty() {
            continue;
        }
        if let Some((oid, name)) = line.split_once(' ') {
            refs.insert(name.trim().to_string(), ObjectId::from_hex(oid.trim())?);
        }
    }
    Ok(refs)
}

/// Reads a single reference, falling back to `packed-refs`.
pub async fn read_reference<F: Filesystem + ?Sized>(fs: &F, name: &str) -> Result<Option<Reference>> {
    match fs.read_to_string(name).await {
        Ok(content) => return Reference::parse(name, &content).map(Some),
        Err(err) if err.is_not_found() => {}
        Err(err) => return Err(err.into()),
    }
    Ok(packed_refs(fs).await?.get(name).copied().map(Reference::Direct))
}

/// Follows a reference to the object it names; `None` if any hop is missing.
pub async fn resolve<F: Filesystem + ?Sized>(fs: &F, name: &str) -> Result<Option<ObjectId>> {
    let mut current = name.to_string();
    for _ in 0..=MAX_SYMREF_DEPTH {
        match read_reference(fs, &current).await? {
            Some(Reference::Direct(id)) => return Ok(Some(id)),
            Some(Reference::Symbolic(target)) => current = target,
            None => return Ok(None),
        }
    }
    Err(GitError::InvalidRef {
        name: name.to_string(),
        reason: format!("more than {} symbolic hops", MAX_SYMREF_DEPTH),
    })
}

/// Lists branch names (without `refs/heads/`), sorted.
pub async fn list_branches<F: Filesystem + ?Sized>(fs: &F) -> Result<Vec<String>> {
    let mut branches: Vec<String> = packed_refs(fs)
        .await?
        .into_keys()
        .filter_map(|name| name.strip_prefix(HEADS).map(str::to_string))
        .collect();

    let root = HEADS.trim_end_matches('/');
    let mut pending = vec![root.to_string()];
    while let Some(dir) = pending.pop() {
        for child in fs.list_children(&dir).await? {
            let path = format!("{}/{}", dir, child);
            let meta = match fs.stat(&path).await {
                Ok(meta) => meta,
                // Removed between listing and stat.
                Err(StorageError::NotFound(_)) => continue,
                Err(err) => return Err(err.into()),
            };
            if meta.is_file {
                if let Some(branch) = path.strip_prefix(HEADS) {
                    branches.push(branch.to_string());
                }
            } else if meta.is_directory {
                pending.push(path);
            }
        }
    }

    branches.sort();
    branches.dedup();
    Ok(branches)
}

/// Points `name` directly at `target`.
pub async fn write_reference<F: Filesystem + ?Sized>(fs: &F, name: &str, target: ObjectId) -> Result<()> {
    let content = Reference::Direct(target).encode();
    fs.write(name, Bytes::from(content)).await?;
    Ok(())
}

/// Makes `name` a symbolic ref to `target`.
pub async fn write_symbolic<F: Filesystem + ?Sized>(fs: &F, name: &str, target: &str) -> Result<()> {
    let content = Reference::Symbolic(target.to_string()).encode();
    fs.write(name, Bytes::from(content)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stratus_storage::{CacheLayer, MemoryBackend, RepoFs};

    fn repo_fs() -> RepoFs {
        RepoFs::new(
            Arc::new(MemoryBackend::new()),
            "repos/refs-test",
            Arc::new(CacheLayer::default()),
        )
    }

    fn oid(n: u8) -> ObjectId {
        ObjectId::from_bytes([n; 20])
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(
            Reference::parse("HEAD", "ref: refs/heads/main\n").unwrap(),
            Reference::Symbolic("refs/heads/main".to_string())
        );
        let direct = Reference::parse("x", &format!("{}\n", oid(7))).unwrap();
        assert_eq!(direct.as_direct(), Some(oid(7)));
        assert!(Reference::parse("x", "garbage").is_err());
    }

    #[tokio::test]
    async fn test_resolve_symbolic_head() {
        let fs = repo_fs();
        write_symbolic(&fs, "HEAD", "refs/heads/main").await.unwrap();
        assert_eq!(resolve(&fs, "HEAD").await.unwrap(), None);

        write_reference(&fs, "refs/heads/main", oid(1)).await.unwrap();
        assert_eq!(resolve(&fs, "HEAD").await.unwrap(), Some(oid(1)));
    }

    #[tokio::test]
    async fn test_packed_refs_fallback() {
        let fs = repo_fs();
        let packed = format!(
            "# pack-refs with: peeled fully-peeled sorted\n{} refs/heads/packed\n{} refs/tags/v1\n^{}\n",
            oid(2),
            oid(3),
            oid(4)
        );
        fs.write("packed-refs", Bytes::from(packed)).await.unwrap();
        write_reference(&fs, "refs/heads/loose", oid(5)).await.unwrap();

        assert_eq!(resolve(&fs, "refs/heads/packed").await.unwrap(), Some(oid(2)));
        assert_eq!(
            list_branches(&fs).await.unwrap(),
            vec!["loose".to_string(), "packed".to_string()]
        );
    }

    #[tokio::test]
    async fn test_loose_ref_shadows_packed() {
        let fs = repo_fs();
        fs.write("packed-refs", Bytes::from(format!("{} refs/heads/main\n", oid(2))))
            .await
            .unwrap();
        write_reference(&fs, "refs/heads/main", oid(9)).await.unwrap();

        assert_eq!(resolve(&fs, "refs/heads/main").await.unwrap(), Some(oid(9)));
        assert_eq!(list_branches(&fs).await.unwrap(), vec!["main".to_string()]);
    }

    #[tokio::test]
    async fn test_nested_branch_names() {
        let fs = repo_fs();
        write_reference(&fs, "refs/heads/feature/login", oid(1)).await.unwrap();
        write_reference(&fs, "refs/heads/main", oid(2)).await.unwrap();

        assert_eq!(
            list_branches(&fs).await.unwrap(),
            vec!["feature/login".to_string(), "main".to_string()]
        );
    }

    #[tokio::test]
    async fn test_symbolic_cycle_is_an_error() {
        let fs = repo_fs();
        write_symbolic(&fs, "refs/heads/a", "refs/heads/b").await.unwrap();
        write_symbolic(&fs, "refs/heads/b", "refs/heads/a").await.unwrap();
        assert!(resolve(&fs, "refs/heads/a").await.is_err());
    }
}
