//! File renames and iterative tree moves.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use super::copy::{file_target, reject_nested};
use super::{LogSink, Run, TransferEngine, TransferLog, TransferSummary};
use crate::error::TransferError;
use crate::paths::has_trailing_separator;
use crate::signal::TransferSignal;
use crate::size::total_size;
use crate::walk::{EntryKind, Worklist, read_entries};

impl TransferEngine {
    /// Renames `src` into place at `dst` and returns the final path.
    ///
    /// A `dst` ending in `/` is a directory: it is created if needed and the
    /// file lands at `dst/<name of src>`. Otherwise `dst` is the exact target
    /// and its parent is created. An existing file at the target is replaced.
    /// Crossing filesystems falls back to copy-then-remove.
    ///
    /// The log is written only when the move succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::NotFound`] for a missing source and
    /// [`TransferError::Io`] when the rename fails.
    #[instrument(skip(self, log), fields(src = %src.display(), dst = %dst.display()))]
    pub fn move_file(
        &self,
        src: &Path,
        dst: &Path,
        log: &LogSink,
    ) -> Result<PathBuf, TransferError> {
        if EntryKind::of_path(src).is_none() {
            return Err(TransferError::not_found(src));
        }
        let target = file_target(src, dst)?;
        if let Some(parent) = target.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| TransferError::io(parent, e))?;
        }

        rename_replacing(src, &target)?;

        let mut batch = TransferLog::new(log);
        batch.record(src, &target);
        batch.flush();
        debug!(target = %target.display(), "moved file");
        Ok(target)
    }

    /// Moves the contents of directory `src` into directory `dst`, then
    /// removes the emptied source directories leaf-first and finally `src`.
    ///
    /// Files are renamed one by one so progress and logging stay per file.
    /// Per-file failures are skipped and counted; a source directory that
    /// still holds a failed file is left in place.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::NotFound`] when `src` is not a directory,
    /// [`TransferError::Io`] when `dst` cannot be created, and
    /// [`TransferError::Interrupted`] on abort.
    #[instrument(skip(self, signal, log), fields(src = %src.display(), dst = %dst.display()))]
    pub fn move_tree(
        &self,
        src: &Path,
        dst: &Path,
        signal: &TransferSignal,
        log: &LogSink,
    ) -> Result<TransferSummary, TransferError> {
        let mut run = Run::start(signal, log, total_size(src));
        let result = self.move_dir(src, dst, &mut run);
        let summary = run.finish(result)?;
        info!(
            files = summary.files,
            failed = summary.failed,
            "move complete"
        );
        Ok(summary)
    }

    /// Moves following the trailing-separator convention: both ends ending
    /// in `/` is a tree move, anything else a single rename.
    ///
    /// # Errors
    ///
    /// Same as [`move_tree`](Self::move_tree) and [`move_file`](Self::move_file).
    pub fn move_file_or_directory(
        &self,
        src: &Path,
        dst: &Path,
        signal: &TransferSignal,
        log: &LogSink,
    ) -> Result<TransferSummary, TransferError> {
        if has_trailing_separator(src) && has_trailing_separator(dst) {
            return self.move_tree(src, dst, signal, log);
        }

        let bytes = total_size(src);
        let mut run = Run::start(signal, log, bytes);
        let result = run.check_abort().and_then(|()| self.move_file(src, dst, log));
        let result = result.map(|_| {
            run.file_done();
            run.add_bytes(bytes);
        });
        run.finish(result)
    }

    pub(super) fn move_dir(
        &self,
        src: &Path,
        dst: &Path,
        run: &mut Run<'_>,
    ) -> Result<(), TransferError> {
        if EntryKind::of_path(src) != Some(EntryKind::Dir) {
            return Err(TransferError::not_found(src));
        }
        reject_nested(src, dst)?;
        fs::create_dir_all(dst).map_err(|e| TransferError::io(dst, e))?;

        let mut emptied = Vec::new();
        let mut pending = Worklist::depth_first((src.to_path_buf(), dst.to_path_buf()));
        while let Some((from_dir, to_dir)) = pending.pop() {
            let entries = match read_entries(&from_dir) {
                Ok(entries) => entries,
                Err(error) => {
                    warn!(dir = %from_dir.display(), %error, "cannot read directory; skipping");
                    run.item_failed();
                    continue;
                }
            };

            for entry in entries {
                run.check_abort()?;
                let target = to_dir.join(&entry.name);
                if entry.kind == EntryKind::Dir {
                    if let Err(error) = fs::create_dir_all(&target) {
                        warn!(dir = %target.display(), %error, "cannot create directory; skipping");
                        run.item_failed();
                        continue;
                    }
                    emptied.push(entry.path.clone());
                    pending.push((entry.path, target));
                    continue;
                }

                let bytes = fs::symlink_metadata(&entry.path).map_or(0, |m| m.len());
                match rename_replacing(&entry.path, &target) {
                    Ok(()) => {
                        run.file_done();
                        run.add_bytes(bytes);
                        run.log().record(&entry.path, &target);
                    }
                    Err(error) => {
                        warn!(src = %entry.path.display(), %error, "move failed; skipping file");
                        run.item_failed();
                    }
                }
            }
        }

        for dir in emptied.iter().rev() {
            if let Err(error) = fs::remove_dir(dir) {
                warn!(dir = %dir.display(), %error, "failed to remove source directory");
            }
        }
        if let Err(error) = fs::remove_dir(src) {
            warn!(dir = %src.display(), %error, "failed to remove source directory");
        }
        Ok(())
    }
}

/// Renames `src` to `target`, replacing an existing file at `target`.
pub(super) fn rename_replacing(src: &Path, target: &Path) -> Result<(), TransferError> {
    let error = match fs::rename(src, target) {
        Ok(()) => return Ok(()),
        Err(error) => error,
    };

    if error.kind() == ErrorKind::CrossesDevices {
        debug!(src = %src.display(), "rename crosses devices; copying instead");
        fs::copy(src, target).map_err(|e| TransferError::io(target, e))?;
        return fs::remove_file(src).map_err(|e| TransferError::io(src, e));
    }

    // Platforms that refuse to rename over an existing file get it removed first.
    if EntryKind::of_path(target) == Some(EntryKind::File) {
        fs::remove_file(target).map_err(|e| TransferError::io(target, e))?;
        return fs::rename(src, target).map_err(|e| TransferError::io(src, e));
    }
    Err(TransferError::io(src, error))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn dir_path(dir: &Path, name: &str) -> PathBuf {
        PathBuf::from(format!("{}/{name}/", dir.display()))
    }

    #[test]
    fn test_move_file_renames_and_leaves_siblings() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a/f.txt"), b"f").unwrap();
        fs::write(dir.path().join("a/g.txt"), b"g").unwrap();

        let engine = TransferEngine::default();
        let target = engine
            .move_file(
                &dir.path().join("a/f.txt"),
                &dir.path().join("b/f.txt"),
                &LogSink::none(),
            )
            .unwrap();

        assert_eq!(target, dir.path().join("b/f.txt"));
        assert_eq!(fs::read(&target).unwrap(), b"f");
        assert!(!dir.path().join("a/f.txt").exists());
        assert!(dir.path().join("a/g.txt").exists());
    }

    #[test]
    fn test_move_file_into_directory_replaces_existing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("f.txt"), b"new").unwrap();
        fs::create_dir_all(dir.path().join("out")).unwrap();
        fs::write(dir.path().join("out/f.txt"), b"old").unwrap();

        let engine = TransferEngine::default();
        engine
            .move_file(
                &dir.path().join("f.txt"),
                &dir_path(dir.path(), "out"),
                &LogSink::none(),
            )
            .unwrap();

        assert_eq!(fs::read(dir.path().join("out/f.txt")).unwrap(), b"new");
    }

    #[test]
    fn test_move_file_missing_source() {
        let dir = TempDir::new().unwrap();
        let result = TransferEngine::default().move_file(
            &dir.path().join("nope"),
            &dir.path().join("x"),
            &LogSink::none(),
        );
        assert!(matches!(result, Err(TransferError::NotFound { .. })));
    }

    #[test]
    fn test_move_tree_moves_everything_and_removes_source() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a");
        fs::create_dir_all(src.join("sub/leaf")).unwrap();
        fs::write(src.join("1.txt"), b"1").unwrap();
        fs::write(src.join("sub/2.txt"), b"22").unwrap();
        fs::write(src.join("sub/leaf/3.txt"), b"333").unwrap();

        let signal = TransferSignal::new();
        let summary = TransferEngine::default()
            .move_file_or_directory(
                &dir_path(dir.path(), "a"),
                &dir_path(dir.path(), "b"),
                &signal,
                &LogSink::none(),
            )
            .unwrap();

        assert_eq!(summary.files, 3);
        assert!(!src.exists());
        assert_eq!(fs::read(dir.path().join("b/sub/leaf/3.txt")).unwrap(), b"333");
        assert_eq!(signal.percent(), 100);
    }

    #[test]
    fn test_move_tree_logs_only_successful_moves() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a/1.txt"), b"1").unwrap();
        let sink = LogSink::none().with_destination(dir.path().join("moved.log"));

        let signal = TransferSignal::new();
        TransferEngine::default()
            .move_tree(&dir.path().join("a"), &dir.path().join("b"), &signal, &sink)
            .unwrap();

        let logged = fs::read_to_string(dir.path().join("moved.log")).unwrap();
        assert_eq!(logged.trim(), dir.path().join("b/1.txt").display().to_string());
    }

    #[test]
    fn test_move_tree_rejects_file_source() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("f"), b"x").unwrap();
        let signal = TransferSignal::new();
        let result = TransferEngine::default().move_tree(
            &dir.path().join("f"),
            &dir.path().join("b"),
            &signal,
            &LogSink::none(),
        );
        assert!(result.is_err());
        assert_eq!(signal.percent(), -1);
    }

    #[test]
    fn test_move_tree_refuses_destination_inside_source() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("f.txt"), b"f").unwrap();

        let signal = TransferSignal::new();
        let result = TransferEngine::default().move_tree(
            &src,
            &src.join("inner/deeper"),
            &signal,
            &LogSink::none(),
        );

        assert!(matches!(result, Err(TransferError::InvalidPath { .. })));
        assert_eq!(fs::read(src.join("f.txt")).unwrap(), b"f");
        assert!(!src.join("inner").exists());
        assert_eq!(signal.percent(), -1);
    }
}
