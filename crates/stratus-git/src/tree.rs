//! Tree objects.

use crate::{GitError, ObjectId, Result};
use std::cmp::Ordering;

/// What a tree entry points at, derived from its mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A file or symlink.
    Blob,
    /// A subdirectory.
    Tree,
    /// A submodule commit.
    Commit,
}

impl EntryKind {
    /// Classifies a mode string.
    pub fn from_mode(mode: &str) -> Self {
        match mode {
            "40000" | "040000" => EntryKind::Tree,
            "160000" => EntryKind::Commit,
            _ => EntryKind::Blob,
        }
    }

    /// Lowercase name used in API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Blob => "blob",
            EntryKind::Tree => "tree",
            EntryKind::Commit => "commit",
        }
    }
}

/// One entry of a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Mode as stored, e.g. `100644` or `40000`.
    pub mode: String,
    /// Entry name (a single path segment).
    pub name: String,
    /// Target object.
    pub oid: ObjectId,
}

impl TreeEntry {
    /// Creates an entry.
    pub fn new(mode: impl Into<String>, name: impl Into<String>, oid: ObjectId) -> Self {
        Self {
            mode: mode.into(),
            name: name.into(),
            oid,
        }
    }

    /// Entry kind.
    pub fn kind(&self) -> EntryKind {
        EntryKind::from_mode(&self.mode)
    }

    /// True for subdirectories.
    pub fn is_tree(&self) -> bool {
        self.kind() == EntryKind::Tree
    }
}

/// Parses raw tree content.
pub fn parse_tree(data: &[u8]) -> Result<Vec<TreeEntry>> {
    let invalid = || GitError::InvalidObject("invalid tree format".to_string());
    let mut entries = Vec::new();
    let mut i = 0;

    while i < data.len() {
        let space_pos = data[i..].iter().position(|&b| b == b' ').ok_or_else(invalid)?;
        let mode = String::from_utf8_lossy(&data[i..i + space_pos]).to_string();
        i += space_pos + 1;

        let null_pos = data[i..].iter().position(|&b| b == 0).ok_or_else(invalid)?;
        let name = String::from_utf8_lossy(&data[i..i + null_pos]).to_string();
        i += null_pos + 1;

        if i + 20 > data.len() {
            return Err(invalid());
        }
        let mut sha_bytes = [0u8; 20];
        sha_bytes.copy_from_slice(&data[i..i + 20]);
        i += 20;

        entries.push(TreeEntry::new(mode, name, ObjectId::from_bytes(sha_bytes)));
    }

    Ok(entries)
}

/// Git's canonical entry order: byte order, with trees compared as `name/`.
fn git_order(a: &TreeEntry, b: &TreeEntry) -> Ordering {
    let key = |entry: &TreeEntry| {
        let mut key = entry.name.as_bytes().to_vec();
        if entry.is_tree() {
            key.push(b'/');
        }
        key
    };
    key(a).cmp(&key(b))
}

/// Serializes entries into raw tree content, in canonical order.
pub fn encode_tree(entries: &[TreeEntry]) -> Vec<u8> {
    let mut sorted: Vec<&TreeEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| git_order(a, b));

    let mut out = Vec::new();
    for entry in sorted {
        out.extend_from_slice(entry.mode.as_bytes());
        out.push(b' ');
        out.extend_from_slice(entry.name.as_bytes());
        out.push(0);
        out.extend_from_slice(entry.oid.as_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(n: u8) -> ObjectId {
        ObjectId::from_bytes([n; 20])
    }

    #[test]
    fn test_kind_from_mode() {
        assert_eq!(EntryKind::from_mode("100644"), EntryKind::Blob);
        assert_eq!(EntryKind::from_mode("100755"), EntryKind::Blob);
        assert_eq!(EntryKind::from_mode("120000"), EntryKind::Blob);
        assert_eq!(EntryKind::from_mode("40000"), EntryKind::Tree);
        assert_eq!(EntryKind::from_mode("160000"), EntryKind::Commit);
    }

    #[test]
    fn test_encode_then_parse() {
        let entries = vec![
            TreeEntry::new("100644", "b.txt", oid(1)),
            TreeEntry::new("40000", "a", oid(2)),
        ];
        let parsed = parse_tree(&encode_tree(&entries)).unwrap();
        assert_eq!(parsed[0].name, "a");
        assert!(parsed[0].is_tree());
        assert_eq!(parsed[1].name, "b.txt");
        assert_eq!(parsed[1].oid, oid(1));
    }

    #[test]
    fn test_canonical_order_treats_trees_as_slash_suffixed() {
        // '.' (0x2e) sorts before '/' (0x2f).
        let entries = vec![
            TreeEntry::new("40000", "foo", oid(1)),
            TreeEntry::new("100644", "foo.c", oid(2)),
        ];
        let parsed = parse_tree(&encode_tree(&entries)).unwrap();
        assert_eq!(parsed[0].name, "foo.c");
        assert_eq!(parsed[1].name, "foo");
    }

    #[test]
    fn test_truncated_tree_is_rejected() {
        let mut data = encode_tree(&[TreeEntry::new("100644", "x", oid(3))]);
        data.truncate(data.len() - 5);
        assert!(parse_tree(&data).is_err());
    }
}
