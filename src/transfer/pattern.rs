//! Wildcard-driven bulk operations and directory mirroring.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use super::delete::delete_path;
use super::moves::rename_replacing;
use super::{LogSink, Run, TransferEngine, TransferSummary};
use crate::error::TransferError;
use crate::matcher::resolve;
use crate::paths::{base_name, has_trailing_separator, without_trailing_separator};
use crate::signal::TransferSignal;
use crate::size::{list_files, total_size, total_size_of};

/// What [`TransferEngine::mirror`] does with each file found under the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorMode {
    /// Copy the file to the same relative path under the target.
    Copy,
    /// Delete the file at the same relative path under the target.
    Delete,
}

impl TransferEngine {
    /// Copies every match of `pattern` into `dest_dir`.
    ///
    /// Files land at `dest_dir/<name>`, directories at `dest_dir/<name>/`.
    /// All matches share one byte counter sized by the summed
    /// [`total_size`] of the matches.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Interrupted`] on abort. Per-match failures
    /// are skipped and counted in [`TransferSummary::failed`].
    #[instrument(skip(self, signal, log), fields(dest = %dest_dir.display()))]
    pub fn copy_by_pattern(
        &self,
        pattern: &str,
        dest_dir: &Path,
        signal: &TransferSignal,
        log: &LogSink,
    ) -> Result<TransferSummary, TransferError> {
        let matches = resolve(pattern);
        let mut run = Run::start(signal, log, total_size_of(&matches));
        let result = self.for_each_match(&matches, &mut run, |engine, found, run| {
            let target = match_target(found, dest_dir)?;
            if has_trailing_separator(found) {
                engine.copy_dir(found, &target, run)
            } else {
                engine.copy_one(found, &target, run)
            }
        });
        let summary = run.finish(result)?;
        info!(pattern, matches = matches.len(), files = summary.files, "pattern copy complete");
        Ok(summary)
    }

    /// Moves every match of `pattern` into `dest_dir`.
    ///
    /// Files land at `dest_dir/<name>`, directories at `dest_dir/<name>/`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Interrupted`] on abort. Per-match failures
    /// are skipped and counted.
    #[instrument(skip(self, signal, log), fields(dest = %dest_dir.display()))]
    pub fn move_by_pattern(
        &self,
        pattern: &str,
        dest_dir: &Path,
        signal: &TransferSignal,
        log: &LogSink,
    ) -> Result<TransferSummary, TransferError> {
        let matches = resolve(pattern);
        let mut run = Run::start(signal, log, total_size_of(&matches));
        let result = self.for_each_match(&matches, &mut run, |engine, found, run| {
            let target = match_target(found, dest_dir)?;
            if has_trailing_separator(found) {
                return engine.move_dir(found, &target, run);
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| TransferError::io(parent, e))?;
            }
            let bytes = total_size(found);
            rename_replacing(found, &target)?;
            run.file_done();
            run.add_bytes(bytes);
            run.log().record(found, &target);
            Ok(())
        });
        let summary = run.finish(result)?;
        info!(pattern, matches = matches.len(), files = summary.files, "pattern move complete");
        Ok(summary)
    }

    /// Deletes every match of `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::DangerousPattern`] without touching anything
    /// when the pattern could wipe a protected root, and
    /// [`TransferError::Interrupted`] on abort.
    #[instrument(skip(self, signal, log))]
    pub fn delete_by_pattern(
        &self,
        pattern: &str,
        signal: &TransferSignal,
        log: &LogSink,
    ) -> Result<TransferSummary, TransferError> {
        if self.protected().is_dangerous_pattern(pattern) {
            signal.begin();
            signal.fail();
            warn!(pattern, "refusing dangerous delete pattern");
            return Err(TransferError::DangerousPattern {
                pattern: pattern.to_string(),
            });
        }

        let matches = resolve(pattern);
        let mut run = Run::start(signal, log, total_size_of(&matches));
        let result = self.for_each_match(&matches, &mut run, |_, found, run| delete_path(found, run));
        let summary = run.finish(result)?;
        info!(pattern, matches = matches.len(), files = summary.files, "pattern delete complete");
        Ok(summary)
    }

    /// Applies `mode` to the counterpart under `target_dir` of every regular
    /// file under `source_dir`.
    ///
    /// Copy mode skips files whose source and target paths are identical.
    /// Delete mode ignores counterparts that do not exist.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::NotFound`] when `source_dir` does not exist
    /// and [`TransferError::Interrupted`] on abort.
    #[instrument(skip(self, signal, log), fields(source = %source_dir.display(), target = %target_dir.display()))]
    pub fn mirror(
        &self,
        source_dir: &Path,
        target_dir: &Path,
        mode: MirrorMode,
        signal: &TransferSignal,
        log: &LogSink,
    ) -> Result<TransferSummary, TransferError> {
        let total = match mode {
            MirrorMode::Copy => total_size(source_dir),
            MirrorMode::Delete => 0,
        };
        let mut run = Run::start(signal, log, total);
        let result = self.mirror_files(source_dir, target_dir, mode, &mut run);
        let summary = run.finish(result)?;
        info!(?mode, files = summary.files, failed = summary.failed, "mirror complete");
        Ok(summary)
    }

    fn mirror_files(
        &self,
        source_dir: &Path,
        target_dir: &Path,
        mode: MirrorMode,
        run: &mut Run<'_>,
    ) -> Result<(), TransferError> {
        if !source_dir.is_dir() {
            return Err(TransferError::not_found(source_dir));
        }
        let source_root = without_trailing_separator(source_dir);

        for file in list_files(&source_root) {
            run.check_abort()?;
            let Ok(relative) = file.strip_prefix(&source_root) else {
                continue;
            };
            let counterpart = target_dir.join(relative);

            let outcome = match mode {
                MirrorMode::Copy if counterpart == file => {
                    debug!(path = %file.display(), "source and target are identical; skipping");
                    continue;
                }
                MirrorMode::Copy => self.copy_one(&file, &counterpart, run),
                MirrorMode::Delete if counterpart.symlink_metadata().is_err() => continue,
                MirrorMode::Delete => delete_path(&counterpart, run),
            };
            match outcome {
                Ok(()) => {}
                Err(TransferError::Interrupted) => return Err(TransferError::Interrupted),
                Err(error) => {
                    warn!(path = %file.display(), %error, "mirror failed; skipping file");
                    run.item_failed();
                }
            }
        }
        Ok(())
    }

    /// Runs `apply` on every match; per-match failures are counted, an abort
    /// stops the loop.
    fn for_each_match<F>(
        &self,
        matches: &[PathBuf],
        run: &mut Run<'_>,
        mut apply: F,
    ) -> Result<(), TransferError>
    where
        F: FnMut(&Self, &Path, &mut Run<'_>) -> Result<(), TransferError>,
    {
        for found in matches {
            run.check_abort()?;
            match apply(self, found, run) {
                Ok(()) => {}
                Err(TransferError::Interrupted) => return Err(TransferError::Interrupted),
                Err(error) => {
                    warn!(path = %found.display(), %error, "skipping match");
                    run.item_failed();
                }
            }
        }
        Ok(())
    }
}

/// `dest_dir/<name>` for a matched path; directory matches keep their
/// trailing separator.
fn match_target(found: &Path, dest_dir: &Path) -> Result<PathBuf, TransferError> {
    let name = base_name(found).ok_or_else(|| TransferError::invalid_path(found))?;
    let target = dest_dir.join(name);
    if has_trailing_separator(found) {
        return Ok(PathBuf::from(format!("{}/", target.display())));
    }
    Ok(target)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::policy::ProtectedPaths;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/mods/inner")).unwrap();
        fs::write(dir.path().join("src/a.pak"), b"aaaa").unwrap();
        fs::write(dir.path().join("src/b.pak"), b"bb").unwrap();
        fs::write(dir.path().join("src/readme.txt"), b"r").unwrap();
        fs::write(dir.path().join("src/mods/inner/m.pak"), b"mmm").unwrap();
        dir
    }

    fn pattern(dir: &TempDir, tail: &str) -> String {
        format!("{}/{tail}", dir.path().display())
    }

    #[test]
    fn test_copy_by_pattern_copies_only_matches() {
        let dir = fixture();
        let signal = TransferSignal::new();
        let summary = TransferEngine::default()
            .copy_by_pattern(
                &pattern(&dir, "src/*.pak"),
                &dir.path().join("out"),
                &signal,
                &LogSink::none(),
            )
            .unwrap();

        assert_eq!(summary.files, 2);
        assert_eq!(summary.bytes, 6);
        assert!(dir.path().join("out/a.pak").exists());
        assert!(!dir.path().join("out/readme.txt").exists());
        assert_eq!(signal.percent(), 100);
    }

    #[test]
    fn test_copy_by_pattern_directory_match_keeps_name() {
        let dir = fixture();
        let signal = TransferSignal::new();
        TransferEngine::default()
            .copy_by_pattern(
                &pattern(&dir, "src/mo*/"),
                &dir.path().join("out"),
                &signal,
                &LogSink::none(),
            )
            .unwrap();

        assert_eq!(
            fs::read(dir.path().join("out/mods/inner/m.pak")).unwrap(),
            b"mmm"
        );
    }

    #[test]
    fn test_move_by_pattern_moves_files_and_directories() {
        let dir = fixture();
        let signal = TransferSignal::new();
        let engine = TransferEngine::default();
        engine
            .move_by_pattern(&pattern(&dir, "src/*.pak"), &dir.path().join("out"), &signal, &LogSink::none())
            .unwrap();
        engine
            .move_by_pattern(&pattern(&dir, "src/mods/"), &dir.path().join("out"), &signal, &LogSink::none())
            .unwrap();

        assert!(!dir.path().join("src/a.pak").exists());
        assert!(!dir.path().join("src/mods").exists());
        assert!(dir.path().join("out/b.pak").exists());
        assert!(dir.path().join("out/mods/inner/m.pak").exists());
        assert!(dir.path().join("src/readme.txt").exists());
    }

    #[test]
    fn test_delete_by_pattern_deletes_matches() {
        let dir = fixture();
        let signal = TransferSignal::new();
        let summary = TransferEngine::default()
            .delete_by_pattern(&pattern(&dir, "src/*.pak"), &signal, &LogSink::none())
            .unwrap();

        assert_eq!(summary.files, 2);
        assert!(!dir.path().join("src/a.pak").exists());
        assert!(dir.path().join("src/readme.txt").exists());
    }

    #[test]
    fn test_delete_by_pattern_refuses_dangerous_pattern() {
        let dir = fixture();
        let engine = TransferEngine::new(
            crate::config::EngineConfig::default(),
            ProtectedPaths::default().with_roots([dir.path().join("src").display().to_string()]),
        );
        let signal = TransferSignal::new();
        let result = engine.delete_by_pattern(&pattern(&dir, "src/*"), &signal, &LogSink::none());

        assert!(matches!(result, Err(TransferError::DangerousPattern { .. })));
        assert!(dir.path().join("src/a.pak").exists());
        assert_eq!(signal.percent(), -1);
    }

    #[test]
    fn test_delete_by_pattern_refuses_parent_traversal() {
        let signal = TransferSignal::new();
        let result = TransferEngine::default().delete_by_pattern("/tmp/../*", &signal, &LogSink::none());
        assert!(matches!(result, Err(TransferError::DangerousPattern { .. })));
    }

    #[test]
    fn test_mirror_copy_then_delete() {
        let dir = fixture();
        let engine = TransferEngine::default();
        let signal = TransferSignal::new();
        let source = dir.path().join("src");
        let target = dir.path().join("mirror");

        let copied = engine
            .mirror(&source, &target, MirrorMode::Copy, &signal, &LogSink::none())
            .unwrap();
        assert_eq!(copied.files, 4);
        assert_eq!(fs::read(target.join("mods/inner/m.pak")).unwrap(), b"mmm");

        fs::write(target.join("extra.txt"), b"keep").unwrap();
        let deleted = engine
            .mirror(&source, &target, MirrorMode::Delete, &signal, &LogSink::none())
            .unwrap();
        assert_eq!(deleted.files, 4);
        assert!(!target.join("a.pak").exists());
        assert!(target.join("extra.txt").exists());
        assert!(source.join("a.pak").exists());
    }

    #[test]
    fn test_mirror_copy_onto_itself_is_a_no_op() {
        let dir = fixture();
        let signal = TransferSignal::new();
        let source = dir.path().join("src");
        let summary = TransferEngine::default()
            .mirror(&source, &source, MirrorMode::Copy, &signal, &LogSink::none())
            .unwrap();
        assert_eq!(summary.files, 0);
        assert_eq!(fs::read(source.join("a.pak")).unwrap(), b"aaaa");
    }
}
