//! Commit objects.

use crate::{GitError, ObjectId, Result};

/// An author or committer line: `Name <email> 1700000000 +0000`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Seconds since the unix epoch.
    pub timestamp: i64,
    /// Timezone offset as written, e.g. `+0200`.
    pub offset: String,
}

impl Signature {
    /// Creates a signature in UTC.
    pub fn new(name: impl Into<String>, email: impl Into<String>, timestamp: i64) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            timestamp,
            offset: "+0000".to_string(),
        }
    }

    /// Parses the value part of an author/committer header.
    pub fn parse(line: &str) -> Result<Self> {
        let invalid = || GitError::InvalidObject(format!("invalid signature: {}", line));

        let open = line.find('<').ok_or_else(invalid)?;
        let close = line[open..].find('>').map(|i| open + i).ok_or_else(invalid)?;
        let name = line[..open].trim().to_string();
        let email = line[open + 1..close].to_string();

        let mut rest = line[close + 1..].split_whitespace();
        let timestamp = rest
            .next()
            .and_then(|ts| ts.parse::<i64>().ok())
            .ok_or_else(invalid)?;
        let offset = rest.next().unwrap_or("+0000").to_string();

        Ok(Self {
            name,
            email,
            timestamp,
            offset,
        })
    }

    fn encode(&self) -> String {
        format!("{} <{}> {} {}", self.name, self.email, self.timestamp, self.offset)
    }
}

/// A decoded commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Root tree.
    pub tree: ObjectId,
    /// Parent commits, first parent first.
    pub parents: Vec<ObjectId>,
    /// Author signature.
    pub author: Signature,
    /// Committer signature.
    pub committer: Signature,
    /// Full message.
    pub message: String,
}

impl Commit {
    /// Parses raw commit content.
    ///
    /// Unknown headers (`encoding`, `gpgsig` and its continuation lines) are
    /// skipped.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let text = String::from_utf8_lossy(data);
        let (headers, message) = match text.split_once("\n\n") {
            Some((headers, message)) => (headers, message),
            None => (text.as_ref(), ""),
        };

        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;

        for line in headers.lines() {
            if line.starts_with(' ') {
                continue;
            }
            let Some((key, value)) = line.split_once(' ') else {
                continue;
            };
            match key {
                "tree" => tree = Some(ObjectId::from_hex(value)?),
                "parent" => parents.push(ObjectId::from_hex(value)?),
                "author" => author = Some(Signature::parse(value)?),
                "committer" => committer = Some(Signature::parse(value)?),
                _ => {}
            }
        }

        let tree = tree.ok_or_else(|| GitError::InvalidObject("commit without tree".to_string()))?;
        let author =
            author.ok_or_else(|| GitError::InvalidObject("commit without author".to_string()))?;
        let committer = committer.unwrap_or_else(|| author.clone());

        Ok(Self {
            tree,
            parents,
            author,
            committer,
            message: message.to_string(),
        })
    }

    /// Serializes to raw commit content.
    pub fn encode(&self) -> Vec<u8> {
        let mut content = format!("tree {}\n", self.tree);
        for parent in &self.parents {
            content.push_str(&format!("parent {}\n", parent));
        }
        content.push_str(&format!("author {}\n", self.author.encode()));
        content.push_str(&format!("committer {}\n", self.committer.encode()));
        content.push_str(&format!("\n{}", self.message));
        content.into_bytes()
    }

    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";
    const PARENT: &str = "ce013625030ba8dba906f756967f9e9ca394464a";

    #[test]
    fn test_parse_commit() {
        let raw = format!(
            "tree {TREE}\nparent {PARENT}\nauthor Alice Smith <alice@example.com> 1700000000 +0100\ncommitter Bob <bob@example.com> 1700000100 +0000\n\nAdd feature\n\nLonger body.\n"
        );
        let commit = Commit::parse(raw.as_bytes()).unwrap();

        assert_eq!(commit.tree.to_hex(), TREE);
        assert_eq!(commit.parents.len(), 1);
        assert_eq!(commit.author.name, "Alice Smith");
        assert_eq!(commit.author.email, "alice@example.com");
        assert_eq!(commit.author.timestamp, 1_700_000_000);
        assert_eq!(commit.author.offset, "+0100");
        assert_eq!(commit.committer.timestamp, 1_700_000_100);
        assert_eq!(commit.summary(), "Add feature");
        assert_eq!(commit.message, "Add feature\n\nLonger body.\n");
    }

    #[test]
    fn test_skips_signature_block() {
        let raw = format!(
            "tree {TREE}\nauthor A <a@x> 1 +0000\ncommitter A <a@x> 1 +0000\ngpgsig -----BEGIN PGP SIGNATURE-----\n iQEz\n -----END PGP SIGNATURE-----\n\nsigned\n"
        );
        let commit = Commit::parse(raw.as_bytes()).unwrap();
        assert!(commit.parents.is_empty());
        assert_eq!(commit.message, "signed\n");
    }

    #[test]
    fn test_rejects_missing_tree() {
        assert!(Commit::parse(b"author A <a@x> 1 +0000\n\nmsg").is_err());
    }

    #[test]
    fn test_encode_matches_git_layout() {
        let commit = Commit {
            tree: ObjectId::from_hex(TREE).unwrap(),
            parents: vec![],
            author: Signature::new("A", "a@x", 1),
            committer: Signature::new("A", "a@x", 1),
            message: "init\n".to_string(),
        };
        let encoded = String::from_utf8(commit.encode()).unwrap();
        assert_eq!(
            encoded,
            format!("tree {TREE}\nauthor A <a@x> 1 +0000\ncommitter A <a@x> 1 +0000\n\ninit\n")
        );
        assert_eq!(Commit::parse(encoded.as_bytes()).unwrap(), commit);
    }
}
