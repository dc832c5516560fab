//! Path helpers for the trailing-separator conventions used by every operation.
//!
//! Callers pass paths as strings where a trailing `/` means "directory":
//! `dir/` is a directory operation, `dir/file` a file operation. [`PathBuf`]
//! preserves the trailing separator in its raw bytes, so the helpers here read
//! it back from there rather than from the component view.

use std::path::{MAIN_SEPARATOR, Path, PathBuf};

/// Returns true when `path` ends with a path separator.
#[must_use]
pub fn has_trailing_separator(path: &Path) -> bool {
    let raw = path.as_os_str().as_encoded_bytes();
    matches!(raw.last(), Some(&b'/')) || raw.last() == Some(&(MAIN_SEPARATOR as u8))
}

/// Returns `path` with a trailing separator appended if it has none.
#[must_use]
pub fn with_trailing_separator(path: &Path) -> PathBuf {
    if has_trailing_separator(path) {
        return path.to_path_buf();
    }
    let mut raw = path.as_os_str().to_os_string();
    raw.push("/");
    PathBuf::from(raw)
}

/// Returns `path` with any trailing separators removed (the root stays `/`).
#[must_use]
pub fn without_trailing_separator(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    let trimmed = raw.trim_end_matches(['/', MAIN_SEPARATOR]);
    if trimmed.is_empty() {
        return path.to_path_buf();
    }
    PathBuf::from(trimmed)
}

/// Final path component as a string, ignoring a trailing separator.
#[must_use]
pub fn base_name(path: &Path) -> Option<String> {
    without_trailing_separator(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Splits a pattern into its volume prefix and the remainder.
///
/// The prefix runs through the first `:/` (e.g. `sdmc:/`). Without a volume
/// marker an absolute pattern is rooted at `/` and a relative one at the
/// current directory (empty prefix).
#[must_use]
pub fn split_volume(pattern: &str) -> (&str, &str) {
    if let Some(index) = pattern.find(":/") {
        return pattern.split_at(index + 2);
    }
    if pattern.starts_with('/') {
        return pattern.split_at(1);
    }
    ("", pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_trailing_separator() {
        assert!(has_trailing_separator(Path::new("sdmc:/a/")));
        assert!(!has_trailing_separator(Path::new("sdmc:/a/f.txt")));
        assert!(has_trailing_separator(&PathBuf::from("/tmp/dir/")));
    }

    #[test]
    fn test_with_and_without_trailing_separator() {
        assert_eq!(
            with_trailing_separator(Path::new("/tmp/a")),
            PathBuf::from("/tmp/a/")
        );
        assert_eq!(
            without_trailing_separator(Path::new("/tmp/a//")),
            PathBuf::from("/tmp/a")
        );
        assert_eq!(without_trailing_separator(Path::new("/")), PathBuf::from("/"));
    }

    #[test]
    fn test_base_name_ignores_trailing_separator() {
        assert_eq!(base_name(Path::new("/tmp/dir/")).as_deref(), Some("dir"));
        assert_eq!(base_name(Path::new("/tmp/f.txt")).as_deref(), Some("f.txt"));
    }

    #[test]
    fn test_split_volume() {
        assert_eq!(split_volume("sdmc:/switch/*.nro"), ("sdmc:/", "switch/*.nro"));
        assert_eq!(split_volume("/tmp/x/*"), ("/", "tmp/x/*"));
        assert_eq!(split_volume("rel/*"), ("", "rel/*"));
    }
}
