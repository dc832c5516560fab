//! Iterative tree deletion.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use super::{LogSink, Run, TransferEngine, TransferSummary};
use crate::error::TransferError;
use crate::paths::has_trailing_separator;
use crate::signal::TransferSignal;
use crate::size::total_size;
use crate::walk::{EntryKind, Worklist, read_entries};

impl TransferEngine {
    /// Deletes `path`: a file directly, a directory tree iteratively.
    ///
    /// Files are removed as soon as they are visited. A directory is removed
    /// on its second visit, after all its children have been processed and
    /// popped; one that is still not empty (a child failed) is reported and
    /// left behind. Deleted file paths go to the source log.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::NotFound`] when `path` does not exist and
    /// [`TransferError::Interrupted`] on abort.
    #[instrument(skip(self, signal, log), fields(path = %path.display()))]
    pub fn delete_tree(
        &self,
        path: &Path,
        signal: &TransferSignal,
        log: &LogSink,
    ) -> Result<TransferSummary, TransferError> {
        let mut run = Run::start(signal, log, total_size(path));
        let result = delete_path(path, &mut run);
        let summary = run.finish(result)?;
        info!(files = summary.files, failed = summary.failed, "delete complete");
        Ok(summary)
    }

    /// Deletes following the trailing-separator convention: `dir/` deletes a
    /// tree, a path without a trailing `/` deletes a single file.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::InvalidPath`] when a file-style path names a
    /// directory, plus the errors of [`delete_tree`](Self::delete_tree).
    pub fn delete_file_or_directory(
        &self,
        path: &Path,
        signal: &TransferSignal,
        log: &LogSink,
    ) -> Result<TransferSummary, TransferError> {
        if !has_trailing_separator(path) && EntryKind::of_path(path) == Some(EntryKind::Dir) {
            signal.begin();
            signal.fail();
            return Err(TransferError::invalid_path(path));
        }
        self.delete_tree(path, signal, log)
    }
}

/// Deletes `path` inside an already started run.
pub(super) fn delete_path(path: &Path, run: &mut Run<'_>) -> Result<(), TransferError> {
    match EntryKind::of_path(path) {
        None => return Err(TransferError::not_found(path)),
        Some(EntryKind::Dir) => {}
        Some(_) => {
            run.check_abort()?;
            return delete_file(path, run);
        }
    }

    // (path, children already queued)
    let mut pending: Worklist<(PathBuf, bool)> = Worklist::depth_first((path.to_path_buf(), false));
    while let Some((current, expanded)) = pending.peek_mut().map(|(p, e)| (p.clone(), *e)) {
        run.check_abort()?;

        if expanded {
            pending.pop();
            if let Err(error) = fs::remove_dir(&current) {
                warn!(dir = %current.display(), %error, "failed to delete directory");
                run.item_failed();
            }
            continue;
        }

        match EntryKind::of_path(&current) {
            Some(EntryKind::Dir) => {}
            Some(_) => {
                pending.pop();
                if let Err(error) = delete_file(&current, run) {
                    warn!(path = %current.display(), %error, "failed to delete file");
                    run.item_failed();
                }
                continue;
            }
            None => {
                pending.pop();
                continue;
            }
        }

        if let Some(top) = pending.peek_mut() {
            top.1 = true;
        }
        match read_entries(&current) {
            Ok(entries) => {
                for entry in entries {
                    pending.push((entry.path, false));
                }
            }
            Err(error) => {
                warn!(dir = %current.display(), %error, "cannot read directory");
            }
        }
    }
    Ok(())
}

fn delete_file(path: &Path, run: &mut Run<'_>) -> Result<(), TransferError> {
    let bytes = fs::symlink_metadata(path).map_or(0, |m| m.len());
    fs::remove_file(path).map_err(|e| TransferError::io(path, e))?;
    run.file_done();
    run.add_bytes(bytes);
    run.log().record_source(path);
    debug!(path = %path.display(), "deleted file");
    Ok(())
}
