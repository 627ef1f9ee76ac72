//! Repository types for Stratus.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Root under which every repository prefix is allocated.
pub const PREFIX_ROOT: &str = "repos";

/// A unique identifier for a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryId([u8; 32]);

impl RepositoryId {
    /// Creates a new repository ID from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Generates a repository ID from the owner and repository name.
    ///
    /// A non-zero `salt` yields a different ID for the same pair; the registry
    /// uses it when the plain derivation is already taken by a renamed
    /// repository that kept its prefix.
    pub fn generate(owner: &str, name: &str, salt: u32) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(owner.as_bytes());
        hasher.update(b":");
        hasher.update(name.as_bytes());
        if salt > 0 {
            hasher.update(b":");
            hasher.update(salt.to_be_bytes());
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Returns the ID as a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the object-store prefix owned by this repository.
    pub fn prefix(&self) -> String {
        format!("{}/{}", PREFIX_ROOT, self.to_hex())
    }
}

impl std::fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Visibility of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Readable by anyone.
    #[default]
    Public,
    /// Readable only by the owning identity.
    Private,
}

/// A hosted repository and the object-store prefix that holds its data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    /// Owning identity.
    pub owner: String,
    /// Human-readable name.
    pub name: String,
    /// Object-store prefix; assigned once and never changed.
    pub prefix: String,
    /// Default branch name.
    pub default_branch: String,
    /// Repository visibility.
    pub visibility: Visibility,
    /// Creation timestamp (unix millis).
    pub created_at: u64,
}

impl Repository {
    /// Creates a new repository record with the given prefix.
    pub fn new(owner: impl Into<String>, name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            prefix: prefix.into(),
            default_branch: "main".to_string(),
            visibility: Visibility::Public,
            created_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
        }
    }

    /// Sets the default branch.
    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = branch.into();
        self
    }

    /// Sets the visibility.
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Returns the full name (owner/name).
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Returns true if `requester` may read this repository.
    pub fn is_readable_by(&self, requester: Option<&str>) -> bool {
        match self.visibility {
            Visibility::Public => true,
            Visibility::Private => requester == Some(self.owner.as_str()),
        }
    }
}
