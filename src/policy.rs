//! Protected destination paths and the dangerous-pattern guard.
//!
//! A protected path is a destination that must never be silently
//! overwritten. Writes aimed at one are redirected to the same name with a
//! fixed suffix appended to the final component. The policy only ever applies
//! to destinations; sources are read as-is.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::DEFAULT_PROTECTED_SUFFIX;
use crate::paths::without_trailing_separator;

/// Set of reserved destination paths plus the roots delete patterns may not
/// sweep.
#[derive(Debug, Clone)]
pub struct ProtectedPaths {
    paths: HashSet<String>,
    suffix: String,
    roots: Vec<String>,
}

impl Default for ProtectedPaths {
    fn default() -> Self {
        Self::new(DEFAULT_PROTECTED_SUFFIX)
    }
}

impl ProtectedPaths {
    /// Creates an empty policy that suffixes collisions with `suffix`.
    ///
    /// The filesystem root `/` is always a protected root.
    #[must_use]
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            paths: HashSet::new(),
            suffix: suffix.into(),
            roots: vec!["/".to_string()],
        }
    }

    /// Adds reserved destination paths (exact string matches).
    #[must_use]
    pub fn with_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Adds roots that delete patterns may not target wholesale.
    #[must_use]
    pub fn with_roots<I, S>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for root in roots {
            let mut root: String = root.into();
            if !root.ends_with('/') {
                root.push('/');
            }
            self.roots.push(root);
        }
        self
    }

    /// Adds one reserved destination path.
    pub fn insert(&mut self, path: impl Into<String>) {
        self.paths.insert(path.into());
    }

    /// Suffix appended to protected destinations.
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Returns true when `destination` exactly matches a reserved path.
    #[must_use]
    pub fn is_protected(&self, destination: &Path) -> bool {
        self.paths.contains(destination.to_string_lossy().as_ref())
    }

    /// Returns the path to actually write for `destination`.
    ///
    /// Unchanged unless `destination` is reserved, in which case the suffix is
    /// appended to its final component.
    #[must_use]
    pub fn protect(&self, destination: &Path) -> PathBuf {
        if !self.is_protected(destination) {
            return destination.to_path_buf();
        }
        let mut redirected = without_trailing_separator(destination).into_os_string();
        redirected.push(&self.suffix);
        let redirected = PathBuf::from(redirected);
        info!(
            destination = %destination.display(),
            redirected = %redirected.display(),
            "destination is protected; writing to suffixed path"
        );
        redirected
    }

    /// Returns true when deleting `pattern` would sweep a protected root or
    /// escape it.
    ///
    /// Dangerous: a protected root itself, a root followed by `*` or `*/`,
    /// anything containing `..` or `~`, and a wildcard inside the volume
    /// prefix.
    #[must_use]
    pub fn is_dangerous_pattern(&self, pattern: &str) -> bool {
        if pattern.contains("..") || pattern.contains('~') {
            return true;
        }
        if let Some(index) = pattern.find(":/")
            && pattern[..index].contains(['*', '?', '['])
        {
            return true;
        }

        let with_slash = if pattern.ends_with('/') {
            pattern.to_string()
        } else {
            format!("{pattern}/")
        };
        let volume_root = pattern
            .find(":/")
            .map(|index| &pattern[..index + 2]);

        self.roots
            .iter()
            .map(String::as_str)
            .chain(volume_root)
            .any(|root| {
                with_slash == root || pattern == format!("{root}*") || pattern == format!("{root}*/")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protect_leaves_unreserved_paths_alone() {
        let policy = ProtectedPaths::default().with_paths(["/sd/boot.bin"]);
        assert_eq!(
            policy.protect(Path::new("/sd/other.bin")),
            PathBuf::from("/sd/other.bin")
        );
    }

    #[test]
    fn test_protect_suffixes_reserved_path() {
        let policy = ProtectedPaths::new(".ultra").with_paths(["/sd/boot.bin"]);
        assert_eq!(
            policy.protect(Path::new("/sd/boot.bin")),
            PathBuf::from("/sd/boot.bin.ultra")
        );
    }

    #[test]
    fn test_protect_is_exact_match_only() {
        let policy = ProtectedPaths::default().with_paths(["/sd/boot.bin"]);
        assert!(!policy.is_protected(Path::new("/sd/boot.bin2")));
        assert!(!policy.is_protected(Path::new("/sd/./boot.bin")));
    }

    #[test]
    fn test_dangerous_pattern_roots() {
        let policy = ProtectedPaths::default().with_roots(["sdmc:/atmosphere"]);
        assert!(policy.is_dangerous_pattern("/"));
        assert!(policy.is_dangerous_pattern("/*"));
        assert!(policy.is_dangerous_pattern("sdmc:/"));
        assert!(policy.is_dangerous_pattern("sdmc:/*/"));
        assert!(policy.is_dangerous_pattern("sdmc:/atmosphere/"));
        assert!(policy.is_dangerous_pattern("sdmc:/atmosphere"));
        assert!(policy.is_dangerous_pattern("sdmc:/atmosphere/*"));
    }

    #[test]
    fn test_dangerous_pattern_traversal_and_volume_wildcards() {
        let policy = ProtectedPaths::default();
        assert!(policy.is_dangerous_pattern("sdmc:/mods/../"));
        assert!(policy.is_dangerous_pattern("~/mods"));
        assert!(policy.is_dangerous_pattern("*:/mods/x"));
    }

    #[test]
    fn test_specific_patterns_are_not_dangerous() {
        let policy = ProtectedPaths::default().with_roots(["sdmc:/atmosphere"]);
        assert!(!policy.is_dangerous_pattern("sdmc:/atmosphere/contents/0100*/"));
        assert!(!policy.is_dangerous_pattern("/tmp/work/*.tmp"));
    }
}
