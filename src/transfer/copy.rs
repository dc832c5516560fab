//! Chunked file copy and iterative tree copy.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use super::io::open_with_retries;
use super::{LogSink, PartialFile, PumpError, Run, TransferEngine, TransferSummary, pump};
use crate::error::TransferError;
use crate::paths::{base_name, has_trailing_separator};
use crate::signal::TransferSignal;
use crate::size::total_size;
use crate::walk::{EntryKind, Worklist, read_entries};

impl TransferEngine {
    /// Copies the regular file `src` to the exact path `dst`.
    ///
    /// Parent directories of `dst` are created first. The register tracks
    /// `floor(100 * copied / size(src))`; on abort or failure the partial
    /// destination is removed and the register ends at `-1`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::NotFound`] when `src` cannot be opened,
    /// [`TransferError::Interrupted`] on abort, and
    /// [`TransferError::Io`]/[`TransferError::Truncated`] for failed writes.
    #[instrument(skip(self, signal, log), fields(src = %src.display(), dst = %dst.display()))]
    pub fn copy_file(
        &self,
        src: &Path,
        dst: &Path,
        signal: &TransferSignal,
        log: &LogSink,
    ) -> Result<TransferSummary, TransferError> {
        let mut run = Run::start(signal, log, total_size(src));
        let result = self.copy_one(src, dst, &mut run);
        run.finish(result)
    }

    /// Copies `src` to `dst`: a file to an exact path, a directory's contents
    /// into the directory `dst`.
    ///
    /// Directory copies compute the total size once and share one byte
    /// counter across every file, so the register rises monotonically over
    /// the whole tree. Per-file failures are skipped and counted; only an
    /// abort stops the walk.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::NotFound`] for a missing source,
    /// [`TransferError::Interrupted`] on abort, and [`TransferError::Io`] when
    /// the destination root cannot be created.
    #[instrument(skip(self, signal, log), fields(src = %src.display(), dst = %dst.display()))]
    pub fn copy_tree(
        &self,
        src: &Path,
        dst: &Path,
        signal: &TransferSignal,
        log: &LogSink,
    ) -> Result<TransferSummary, TransferError> {
        let mut run = Run::start(signal, log, total_size(src));
        let result = match EntryKind::of_path(src) {
            Some(EntryKind::Dir) => self.copy_dir(src, dst, &mut run),
            Some(_) => self.copy_one(src, dst, &mut run),
            None => Err(TransferError::not_found(src)),
        };
        let summary = run.finish(result)?;
        info!(
            files = summary.files,
            failed = summary.failed,
            bytes = summary.bytes,
            "copy complete"
        );
        Ok(summary)
    }

    /// Copies following the trailing-separator convention.
    ///
    /// - `src` file, `dst` ending in `/`: copied to `dst/<name of src>`
    /// - `src` file, `dst` file path: copied to `dst`
    /// - `src` directory: its contents copied into `dst` (as a directory)
    ///
    /// # Errors
    ///
    /// Same as [`copy_tree`](Self::copy_tree).
    pub fn copy_file_or_directory(
        &self,
        src: &Path,
        dst: &Path,
        signal: &TransferSignal,
        log: &LogSink,
    ) -> Result<TransferSummary, TransferError> {
        match EntryKind::of_path(src) {
            Some(EntryKind::Dir) | None => self.copy_tree(src, dst, signal, log),
            Some(_) => {
                let target = file_target(src, dst)?;
                self.copy_tree(src, &target, signal, log)
            }
        }
    }

    /// Copies one file, counting its bytes toward `run`.
    pub(super) fn copy_one(
        &self,
        src: &Path,
        dst: &Path,
        run: &mut Run<'_>,
    ) -> Result<(), TransferError> {
        run.check_abort()?;
        let retries = self.config().open_retries;

        let mut source = open_with_retries(src, retries, |p| File::open(p))
            .map_err(|e| TransferError::io(src, e))?;
        let expected = source
            .metadata()
            .map_err(|e| TransferError::io(src, e))?
            .len();

        if let Some(parent) = dst.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| TransferError::io(parent, e))?;
        }
        let capacity = self.config().copy_buffer_size;
        let mut output = open_with_retries(dst, retries, |p| PartialFile::create(p, capacity))
            .map_err(|e| TransferError::io(dst, e))?;

        let mut buffer = vec![0_u8; self.config().copy_buffer_size];
        let signal = run.signal();
        let pumped = pump(&mut source, &mut output, &mut buffer, signal, |n| {
            run.add_bytes(n);
        });

        let copied = match pumped {
            Ok(copied) => copied,
            Err(PumpError::Interrupted) => {
                run.signal().fail();
                debug!(dst = %dst.display(), "copy interrupted; partial output removed");
                return Err(TransferError::Interrupted);
            }
            Err(PumpError::Read(e)) => return Err(TransferError::io(src, e)),
            Err(PumpError::Write(e)) => return Err(TransferError::io(dst, e)),
        };
        if copied != expected {
            return Err(TransferError::truncated(src, expected, copied));
        }
        output.commit().map_err(|e| TransferError::io(dst, e))?;

        run.file_done();
        run.log().record(src, dst);
        debug!(src = %src.display(), dst = %dst.display(), bytes = copied, "copied file");
        Ok(())
    }

    /// Copies the contents of directory `src` into `dst`, depth-first over an
    /// explicit worklist.
    pub(super) fn copy_dir(
        &self,
        src: &Path,
        dst: &Path,
        run: &mut Run<'_>,
    ) -> Result<(), TransferError> {
        reject_nested(src, dst)?;
        fs::create_dir_all(dst).map_err(|e| TransferError::io(dst, e))?;

        let mut pending = Worklist::depth_first((src.to_path_buf(), dst.to_path_buf()));
        while let Some((from_dir, to_dir)) = pending.pop() {
            run.check_abort()?;
            let entries = match read_entries(&from_dir) {
                Ok(entries) => entries,
                Err(error) => {
                    warn!(dir = %from_dir.display(), %error, "cannot read directory; skipping");
                    run.item_failed();
                    continue;
                }
            };

            for entry in entries {
                let target = to_dir.join(&entry.name);
                match entry.kind {
                    EntryKind::Dir => {
                        if let Err(error) = fs::create_dir_all(&target) {
                            warn!(dir = %target.display(), %error, "cannot create directory; skipping");
                            run.item_failed();
                            continue;
                        }
                        pending.push((entry.path, target));
                    }
                    EntryKind::File => match self.copy_one(&entry.path, &target, run) {
                        Ok(()) => {}
                        Err(TransferError::Interrupted) => return Err(TransferError::Interrupted),
                        Err(error) => {
                            warn!(src = %entry.path.display(), %error, "copy failed; skipping file");
                            run.item_failed();
                        }
                    },
                    EntryKind::Other => {
                        debug!(path = %entry.path.display(), "skipping non-regular entry");
                    }
                }
            }
        }
        Ok(())
    }
}

/// Exact destination path for copying or moving the file `src` to `dst`.
pub(super) fn file_target(src: &Path, dst: &Path) -> Result<PathBuf, TransferError> {
    if !has_trailing_separator(dst) {
        return Ok(dst.to_path_buf());
    }
    let name = base_name(src).ok_or_else(|| TransferError::invalid_path(src))?;
    Ok(dst.join(name))
}

/// Refuses a tree walk whose destination lies inside (or is) its source.
pub(super) fn reject_nested(src: &Path, dst: &Path) -> Result<(), TransferError> {
    let Ok(source) = src.canonicalize() else {
        return Ok(());
    };
    if resolve_existing(dst).starts_with(&source) {
        warn!(src = %src.display(), dst = %dst.display(), "destination is inside the source tree");
        return Err(TransferError::invalid_path(dst));
    }
    Ok(())
}

/// Canonical form of `path`, resolving the deepest existing ancestor and
/// appending the components that do not exist yet.
fn resolve_existing(path: &Path) -> PathBuf {
    for ancestor in path.ancestors() {
        let existing = if ancestor.as_os_str().is_empty() {
            Path::new(".")
        } else {
            ancestor
        };
        if let Ok(resolved) = existing.canonicalize() {
            let rest = path.strip_prefix(ancestor).unwrap_or(Path::new(""));
            return resolved.join(rest);
        }
    }
    path.to_path_buf()
}
