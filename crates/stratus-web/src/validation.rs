//! Input validation for owners, repository names, branches and paths.

use crate::WebError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Regex for valid owner and repository names.
/// Must start with alphanumeric, can contain alphanumeric, dots, hyphens, and underscores.
pub static NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$").expect("Invalid regex"));

/// Regex for valid branch names.
pub static REF_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9/_.-]*$").expect("Invalid regex"));

/// Regex for a full hex object id.
pub static OID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-f]{40}$").expect("Invalid regex"));

/// Maximum length of owner, repository and branch names.
pub const MAX_NAME_LENGTH: usize = 100;

/// Validates an owner or repository name.
pub fn validate_name(field: &str, name: &str) -> Result<(), WebError> {
    if name.is_empty() || name.len() > MAX_NAME_LENGTH {
        return Err(WebError::BadRequest(format!(
            "{} must be 1 to {} characters",
            field, MAX_NAME_LENGTH
        )));
    }
    if !NAME_REGEX.is_match(name) || name.ends_with(".json") {
        return Err(WebError::BadRequest(format!("invalid {}: {}", field, name)));
    }
    Ok(())
}

/// Validates a branch name.
pub fn validate_branch(name: &str) -> Result<(), WebError> {
    if name.is_empty() || name.len() > MAX_NAME_LENGTH {
        return Err(WebError::BadRequest(format!(
            "branch name must be 1 to {} characters",
            MAX_NAME_LENGTH
        )));
    }
    if !REF_NAME_REGEX.is_match(name) {
        return Err(WebError::BadRequest(format!("invalid branch name: {}", name)));
    }
    if name.contains("..")
        || name.contains("//")
        || name.ends_with('/')
        || name.ends_with('.')
        || name.ends_with(".lock")
    {
        return Err(WebError::BadRequest(format!(
            "branch name contains invalid git sequences: {}",
            name
        )));
    }
    Ok(())
}

/// Validates a path inside a repository tree.
pub fn validate_tree_path(path: &str) -> Result<(), WebError> {
    stratus_storage::validate_relative_path(path).map_err(WebError::from)
}

/// Validates a full hex object id.
pub fn validate_oid(oid: &str) -> Result<(), WebError> {
    if OID_REGEX.is_match(oid) {
        Ok(())
    } else {
        Err(WebError::BadRequest(format!("invalid commit id: {}", oid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_name("name", "my-repo").is_ok());
        assert!(validate_name("name", "repo_2.0").is_ok());
        assert!(validate_name("owner", "Alice").is_ok());
    }

    #[test]
    fn test_invalid_names() {
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", "-repo").is_err());
        assert!(validate_name("name", "a/b").is_err());
        assert!(validate_name("name", "..").is_err());
        assert!(validate_name("name", "x.json").is_err());
        assert!(validate_name("name", &"a".repeat(101)).is_err());
    }

    #[test]
    fn test_branch_names() {
        assert!(validate_branch("main").is_ok());
        assert!(validate_branch("feature/login").is_ok());
        assert!(validate_branch("release-1.0").is_ok());
        assert!(validate_branch("a..b").is_err());
        assert!(validate_branch("feature/").is_err());
        assert!(validate_branch("main.lock").is_err());
        assert!(validate_branch("/main").is_err());
    }

    #[test]
    fn test_tree_paths() {
        assert!(validate_tree_path("src/lib.rs").is_ok());
        assert!(validate_tree_path("").is_ok());
        assert!(validate_tree_path("../etc/passwd").is_err());
    }

    #[test]
    fn test_oids() {
        assert!(validate_oid(&"a".repeat(40)).is_ok());
        assert!(validate_oid(&"A".repeat(40)).is_err());
        assert!(validate_oid("abc").is_err());
    }
}
