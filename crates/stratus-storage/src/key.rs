//! Mapping between repository-relative paths and object-store keys.
//!
//! A key is `prefix + "/" + normalized path`. Normalization collapses
//! repeated separators, strips leading and trailing separators and drops `.`
//! segments, so logically identical paths always land on the same key.
//! Parent references are not normalized away: they are rejected by
//! [`validate_relative_path`] before a path reaches [`to_key`], since the
//! object store has no traversal protection of its own.

use crate::{Result, StorageError};

/// Separator between key segments.
pub const SEPARATOR: char = '/';

/// Maximum accepted length of a relative path.
pub const MAX_PATH_LENGTH: usize = 4096;

/// Normalizes a path into its canonical segment form.
pub fn normalize(path: &str) -> String {
    path.split(SEPARATOR)
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Maps a repository-relative path to its object-store key.
///
/// Idempotent: input that already begins with the prefix is returned in
/// normalized form rather than prefixed a second time. An empty path maps to
/// the prefix itself (the repository root).
pub fn to_key(prefix: &str, relative: &str) -> String {
    let prefix = normalize(prefix);
    let relative = normalize(relative);

    if prefix.is_empty() {
        return relative;
    }
    if relative.is_empty() {
        return prefix;
    }
    if is_within(&prefix, &relative) {
        return relative;
    }
    format!("{}/{}", prefix, relative)
}

/// Returns the repository-relative part of `key`, if it lies under `prefix`.
pub fn relative_to<'a>(prefix: &str, key: &'a str) -> Option<&'a str> {
    if key == prefix {
        return Some("");
    }
    key.strip_prefix(prefix)?.strip_prefix(SEPARATOR)
}

/// Returns true if `key` equals `prefix` or lies beneath it.
pub fn is_within(prefix: &str, key: &str) -> bool {
    relative_to(prefix, key).is_some()
}

/// Rejects paths that could escape the repository prefix or alias keys.
pub fn validate_relative_path(path: &str) -> Result<()> {
    if path.len() > MAX_PATH_LENGTH {
        return Err(StorageError::MalformedPath(format!(
            "path exceeds {} bytes",
            MAX_PATH_LENGTH
        )));
    }
    if path.contains('\0') {
        return Err(StorageError::MalformedPath(
            "path contains a null byte".to_string(),
        ));
    }
    if path.contains('\\') {
        return Err(StorageError::MalformedPath(format!(
            "path contains a backslash: {}",
            path
        )));
    }
    if path.split(SEPARATOR).any(|segment| segment == "..") {
        return Err(StorageError::MalformedPath(format!(
            "path contains a parent reference: {}",
            path
        )));
    }
    Ok(())
}

/// Returns the parent of a normalized relative path (`""` for top level).
pub fn parent(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(idx) => &path[..idx],
        None => "",
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn segment() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_.-]{1,12}".prop_filter("no parent refs", |s| s != "..")
    }

    proptest! {
        /// Property: mapping a key a second time returns it unchanged.
        #[test]
        fn prop_to_key_idempotent(segments in prop::collection::vec(segment(), 0..8)) {
            let path = segments.join("/");
            let once = to_key(PREFIX_FOR_TESTS, &path);
            let twice = to_key(PREFIX_FOR_TESTS, &once);
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(once, to_key(PREFIX_FOR_TESTS, &path));
        }

        /// Property: extra separators never change the resulting key.
        #[test]
        fn prop_separator_noise_is_ignored(
            segments in prop::collection::vec(segment(), 1..6),
            leading in 0usize..3,
            trailing in 0usize..3,
        ) {
            let clean = segments.join("/");
            let noisy = format!("{}{}{}", "/".repeat(leading), segments.join("//"), "/".repeat(trailing));
            prop_assert_eq!(to_key(PREFIX_FOR_TESTS, &clean), to_key(PREFIX_FOR_TESTS, &noisy));
        }

        /// Property: every key stays under its prefix.
        #[test]
        fn prop_key_stays_under_prefix(segments in prop::collection::vec(segment(), 0..8)) {
            let key = to_key(PREFIX_FOR_TESTS, &segments.join("/"));
            prop_assert!(is_within(PREFIX_FOR_TESTS, &key));
        }
    }

    const PREFIX_FOR_TESTS: &str = "repos/0f0f";
}
