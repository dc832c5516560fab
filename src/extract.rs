//! Two-pass ZIP extraction with one monotonic progress counter.
//!
//! Pass 1 walks the central directory and sums the uncompressed size of every
//! non-directory entry, counting each as at least one byte. Pass 2 streams
//! each entry through a bounded buffer into a [`PartialFile`], adding to the
//! same counter, so the register climbs once from `0` to `100` for the whole
//! archive.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, instrument, warn};
use zip::ZipArchive;

use crate::config::EngineConfig;
use crate::error::TransferError;
use crate::policy::ProtectedPaths;
use crate::signal::TransferSignal;
use crate::transfer::{PartialFile, PumpError, TransferEngine, pump};

/// Characters dropped from extracted names.
const ILLEGAL_NAME_CHARS: [char; 7] = [':', '*', '?', '"', '<', '>', '|'];

/// Counters reported by a finished extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Entries written to disk.
    pub files: usize,
    /// Entries skipped because of a per-entry failure or an unsafe name.
    pub failed: usize,
    /// Uncompressed bytes written.
    pub bytes: u64,
}

/// ZIP extractor.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: EngineConfig,
    protected: ProtectedPaths,
}

impl Extractor {
    /// Creates an extractor with the given tunables and protected paths.
    #[must_use]
    pub fn new(config: EngineConfig, protected: ProtectedPaths) -> Self {
        Self {
            config: config.normalized(),
            protected,
        }
    }

    /// Creates an extractor sharing an engine's tunables and protected paths.
    #[must_use]
    pub fn from_engine(engine: &TransferEngine) -> Self {
        Self::new(engine.config().clone(), engine.protected().clone())
    }

    /// Extracts every file entry of `archive` under `dest_dir`.
    ///
    /// Directory entries are skipped; parents are created on demand. Entries
    /// that fail are removed and skipped; entries whose names escape
    /// `dest_dir` are skipped and counted as failed. The register ends at
    /// `100` when at least one file was written, otherwise at `-1`. The abort
    /// flag is consumed before returning.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::NotFound`]/[`TransferError::Io`] when the
    /// archive cannot be opened, [`TransferError::Archive`] when it is not a
    /// readable ZIP, [`TransferError::Interrupted`] on abort, and
    /// [`TransferError::Empty`] when nothing was extracted.
    #[instrument(skip(self, signal), fields(archive = %archive.display(), dest = %dest_dir.display()))]
    pub fn unzip(
        &self,
        archive: &Path,
        dest_dir: &Path,
        signal: &TransferSignal,
    ) -> Result<ExtractSummary, TransferError> {
        signal.begin();
        let result = self
            .extract_all(archive, dest_dir, signal)
            .and_then(|summary| {
                if summary.files == 0 {
                    Err(TransferError::empty(archive))
                } else {
                    Ok(summary)
                }
            });

        match &result {
            Ok(summary) => {
                signal.complete();
                info!(
                    files = summary.files,
                    failed = summary.failed,
                    bytes = summary.bytes,
                    "extraction complete"
                );
            }
            Err(error) => {
                signal.fail();
                warn!(%error, "extraction failed");
            }
        }
        signal.take_abort();
        result
    }

    fn extract_all(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
        signal: &TransferSignal,
    ) -> Result<ExtractSummary, TransferError> {
        let file = File::open(archive_path).map_err(|e| TransferError::io(archive_path, e))?;
        let reader = BufReader::with_capacity(self.config.extract_buffer_size, file);
        let mut archive =
            ZipArchive::new(reader).map_err(|e| TransferError::archive(archive_path, e))?;

        let total = planned_bytes(&mut archive, signal)?;
        debug!(entries = archive.len(), total, "sized archive");

        fs::create_dir_all(dest_dir).map_err(|e| TransferError::io(dest_dir, e))?;

        let mut summary = ExtractSummary::default();
        let mut done = 0_u64;
        let mut buffer = vec![0_u8; self.config.extract_buffer_size];

        for index in 0..archive.len() {
            if signal.is_abort_requested() {
                return Err(TransferError::Interrupted);
            }
            let mut entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(error) => {
                    warn!(index, %error, "cannot read archive entry; skipping");
                    summary.failed += 1;
                    continue;
                }
            };
            if entry.is_dir() {
                continue;
            }
            let Some(relative) = entry.enclosed_name() else {
                warn!(name = entry.name(), "entry escapes destination; skipping");
                summary.failed += 1;
                continue;
            };
            let output = self.protected.protect(&dest_dir.join(sanitize(&relative)));

            if let Some(parent) = output.parent()
                && let Err(error) = fs::create_dir_all(parent)
            {
                warn!(dir = %parent.display(), %error, "cannot create directory; skipping entry");
                summary.failed += 1;
                continue;
            }
            let mut partial = match PartialFile::create(&output, self.config.extract_write_buffer_size) {
                Ok(partial) => partial,
                Err(error) => {
                    warn!(path = %output.display(), %error, "cannot create output; skipping entry");
                    summary.failed += 1;
                    continue;
                }
            };

            let pumped = pump(&mut entry, &mut partial, &mut buffer, signal, |n| {
                done = done.saturating_add(n);
                signal.advance_bytes(done, total);
            });
            let written = match pumped {
                Ok(written) => written,
                Err(PumpError::Interrupted) => {
                    debug!(path = %output.display(), "extraction interrupted; partial output removed");
                    return Err(TransferError::Interrupted);
                }
                Err(PumpError::Read(error) | PumpError::Write(error)) => {
                    warn!(path = %output.display(), %error, "entry failed; skipping");
                    summary.failed += 1;
                    continue;
                }
            };
            if written == 0 {
                done = done.saturating_add(1);
                signal.advance_bytes(done, total);
            }
            if let Err(error) = partial.commit() {
                warn!(path = %output.display(), %error, "cannot flush output; skipping entry");
                summary.failed += 1;
                continue;
            }

            summary.files += 1;
            summary.bytes += written;
            debug!(path = %output.display(), bytes = written, "extracted entry");
        }
        Ok(summary)
    }
}

/// Sums `max(size, 1)` over every non-directory entry. Cancellable.
fn planned_bytes<R>(archive: &mut ZipArchive<R>, signal: &TransferSignal) -> Result<u64, TransferError>
where
    R: std::io::Read + std::io::Seek,
{
    let mut total = 0_u64;
    for index in 0..archive.len() {
        if signal.is_abort_requested() {
            return Err(TransferError::Interrupted);
        }
        match archive.by_index_raw(index) {
            Ok(entry) if entry.is_dir() => {}
            Ok(entry) => total = total.saturating_add(entry.size().max(1)),
            Err(error) => debug!(index, %error, "cannot size archive entry"),
        }
    }
    Ok(total)
}

/// Drops characters most filesystems reject from every component of an
/// archive-relative path.
fn sanitize(relative: &Path) -> PathBuf {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => {
                let cleaned: String = name
                    .to_string_lossy()
                    .chars()
                    .filter(|c| !ILLEGAL_NAME_CHARS.contains(c))
                    .collect();
                (!cleaned.is_empty()).then_some(cleaned)
            }
            _ => None,
        })
        .collect()
}
