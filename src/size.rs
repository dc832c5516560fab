//! Total byte size of a file or directory tree.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::walk::{EntryKind, Worklist, read_entries};

/// Returns the size of `path` in bytes.
///
/// A regular file yields its length. A directory yields the sum over every
/// regular file beneath it, walked breadth-first with an explicit queue.
/// Symlinks are never followed and never counted. Unreadable subdirectories
/// contribute `0`. Anything else, including a missing path, is `0`.
#[must_use]
pub fn total_size(path: &Path) -> u64 {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return 0;
    };
    if meta.is_file() {
        return meta.len();
    }
    if !meta.is_dir() {
        return 0;
    }

    let mut total = 0_u64;
    let mut pending = Worklist::breadth_first(path.to_path_buf());
    while let Some(dir) = pending.pop() {
        let entries = match read_entries(&dir) {
            Ok(entries) => entries,
            Err(error) => {
                debug!(dir = %dir.display(), %error, "skipping unreadable directory");
                continue;
            }
        };
        for entry in entries {
            match entry.kind {
                EntryKind::File => {
                    total += fs::symlink_metadata(&entry.path).map_or(0, |m| m.len());
                }
                EntryKind::Dir => pending.push(entry.path),
                EntryKind::Other => {}
            }
        }
    }
    total
}

/// Sum of [`total_size`] over `paths`.
#[must_use]
pub fn total_size_of<P: AsRef<Path>>(paths: &[P]) -> u64 {
    paths.iter().map(|p| total_size(p.as_ref())).sum()
}

/// Every regular file beneath `dir`, in walk order.
pub(crate) fn list_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = Worklist::breadth_first(dir.to_path_buf());
    while let Some(current) = pending.pop() {
        let Ok(entries) = read_entries(&current) else {
            continue;
        };
        for entry in entries {
            match entry.kind {
                EntryKind::File => files.push(entry.path),
                EntryKind::Dir => pending.push(entry.path),
                EntryKind::Other => {}
            }
        }
    }
    files
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_total_size_of_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f.bin");
        fs::write(&file, vec![0_u8; 1234]).unwrap();
        assert_eq!(total_size(&file), 1234);
    }

    #[test]
    fn test_total_size_of_nested_tree() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(root.join("top.bin"), vec![1_u8; 10]).unwrap();
        fs::write(root.join("a/one.bin"), vec![1_u8; 20]).unwrap();
        fs::write(root.join("a/b/c/deep.bin"), vec![1_u8; 30]).unwrap();
        fs::write(root.join("a/b/zero.bin"), b"").unwrap();
        assert_eq!(total_size(root), 60);
    }

    #[cfg(unix)]
    #[test]
    fn test_total_size_does_not_follow_symlinks() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("tree")).unwrap();
        fs::write(root.join("big.bin"), vec![0_u8; 500]).unwrap();
        fs::write(root.join("tree/small.bin"), vec![0_u8; 5]).unwrap();
        std::os::unix::fs::symlink(root.join("big.bin"), root.join("tree/link.bin")).unwrap();
        assert_eq!(total_size(&root.join("tree")), 5);
    }

    #[test]
    fn test_total_size_missing_path_is_zero() {
        let dir = TempDir::new().unwrap();
        assert_eq!(total_size(&dir.path().join("missing")), 0);
    }

    #[test]
    fn test_list_files_finds_every_regular_file() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("x/y")).unwrap();
        fs::write(root.join("x/1"), b"1").unwrap();
        fs::write(root.join("x/y/2"), b"2").unwrap();
        let mut files = list_files(root);
        files.sort();
        assert_eq!(files, vec![root.join("x/1"), root.join("x/y/2")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_total_size_skips_unreadable_subdirectory() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("locked")).unwrap();
        fs::write(root.join("open.bin"), vec![0_u8; 40]).unwrap();
        fs::write(root.join("locked/hidden.bin"), vec![0_u8; 900]).unwrap();
        fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users read through mode 000; nothing to observe then.
        let readable = fs::read_dir(root.join("locked")).is_ok();
        let size = total_size(root);
        fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            return;
        }

        assert_eq!(size, 40);
    }
}
