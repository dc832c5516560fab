//! Progress- and cancellation-aware copy, move, and delete.
//!
//! This module provides [`TransferEngine`], which moves bytes between local
//! paths in bounded chunks while publishing progress to a [`TransferSignal`]
//! and honoring its abort flag.
//!
//! # Features
//!
//! - Chunked single-file copy with partial-output cleanup on every exit path
//! - Tree copy/move over an explicit worklist, with one byte counter for the
//!   whole top-level call so progress never moves backwards
//! - Iterative tree delete (no recursion proportional to depth)
//! - Wildcard-driven variants built on [`crate::matcher::resolve`]
//! - Batched source/destination logs written once per top-level call
//!
//! # Dispatch convention
//!
//! The `*_file_or_directory` entry points read a trailing `/` as "directory":
//! `copy a/ b/` copies a tree, `copy a/f.txt b/` copies one file into `b/`,
//! `copy a/f.txt b/g.txt` copies one file to an exact path.
//!
//! # Example
//!
//! ```no_run
//! use transfer_core::{EngineConfig, LogSink, ProtectedPaths, TransferEngine, TransferSignal};
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = TransferEngine::new(EngineConfig::default(), ProtectedPaths::default());
//! let signal = TransferSignal::new();
//! let summary = engine.copy_file_or_directory(
//!     Path::new("/data/mods/"),
//!     Path::new("/backup/mods/"),
//!     &signal,
//!     &LogSink::none(),
//! )?;
//! println!("copied {} files ({} bytes)", summary.files, summary.bytes);
//! # Ok(())
//! # }
//! ```

mod copy;
mod delete;
mod io;
mod log;
mod moves;
mod pattern;

pub use log::LogSink;
pub use pattern::MirrorMode;

pub(crate) use io::{PartialFile, PumpError, pump};
pub(crate) use log::TransferLog;

use crate::config::EngineConfig;
use crate::error::TransferError;
use crate::policy::ProtectedPaths;
use crate::signal::TransferSignal;

/// Counters reported by a finished top-level transfer call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferSummary {
    /// Files successfully copied, moved, or deleted.
    pub files: usize,
    /// Items skipped because of a per-item failure.
    pub failed: usize,
    /// Bytes copied, moved, or deleted.
    pub bytes: u64,
}

/// Local copy/move/delete engine.
///
/// Holds only configuration; every call takes the [`TransferSignal`] it
/// reports to, so one engine can serve many callers.
#[derive(Debug, Clone, Default)]
pub struct TransferEngine {
    config: EngineConfig,
    protected: ProtectedPaths,
}

impl TransferEngine {
    /// Creates an engine with the given tunables and protected paths.
    #[must_use]
    pub fn new(config: EngineConfig, protected: ProtectedPaths) -> Self {
        Self {
            config: config.normalized(),
            protected,
        }
    }

    /// Engine tunables.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Protected paths consulted by delete patterns.
    #[must_use]
    pub fn protected(&self) -> &ProtectedPaths {
        &self.protected
    }
}

/// State of one top-level call: the signal it reports to, the shared byte
/// counter, and the batched log.
pub(crate) struct Run<'a> {
    signal: &'a TransferSignal,
    log: TransferLog<'a>,
    done: u64,
    total: u64,
    summary: TransferSummary,
}

impl<'a> Run<'a> {
    /// Resets `signal` and starts counting toward `total` bytes.
    pub(crate) fn start(signal: &'a TransferSignal, sink: &'a LogSink, total: u64) -> Self {
        signal.begin();
        Self {
            signal,
            log: TransferLog::new(sink),
            done: 0,
            total,
            summary: TransferSummary::default(),
        }
    }

    /// Fails with [`TransferError::Interrupted`] once an abort is requested.
    pub(crate) fn check_abort(&self) -> Result<(), TransferError> {
        if self.signal.is_abort_requested() {
            self.signal.fail();
            return Err(TransferError::Interrupted);
        }
        Ok(())
    }

    /// Adds `bytes` to the shared counter and publishes the new percentage.
    pub(crate) fn add_bytes(&mut self, bytes: u64) {
        self.done = self.done.saturating_add(bytes);
        self.summary.bytes = self.summary.bytes.saturating_add(bytes);
        self.signal.advance_bytes(self.done, self.total);
    }

    pub(crate) fn signal(&self) -> &'a TransferSignal {
        self.signal
    }

    pub(crate) fn log(&mut self) -> &mut TransferLog<'a> {
        &mut self.log
    }

    pub(crate) fn file_done(&mut self) {
        self.summary.files += 1;
    }

    pub(crate) fn item_failed(&mut self) {
        self.summary.failed += 1;
    }

    /// Flushes the log, finalizes the register, and consumes the abort flag.
    pub(crate) fn finish(
        self,
        result: Result<(), TransferError>,
    ) -> Result<TransferSummary, TransferError> {
        self.log.flush();
        match &result {
            Ok(()) => self.signal.complete(),
            Err(_) => self.signal.fail(),
        }
        self.signal.take_abort();
        result.map(|()| self.summary)
    }
}
