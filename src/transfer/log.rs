//! Batched source/destination logs.
//!
//! Paths are collected in memory during a top-level call and appended to the
//! log files once at the end, one path per line.

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

/// Serializes appends so concurrent calls never interleave partial lines.
static LOG_WRITE_LOCK: Mutex<()> = Mutex::new(());

/// Optional append-only log files for a top-level call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSink {
    /// Receives one line per processed source path.
    pub source: Option<PathBuf>,
    /// Receives one line per written destination path.
    pub destination: Option<PathBuf>,
}

impl LogSink {
    /// No logging.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Logs source paths to `path`.
    #[must_use]
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Logs destination paths to `path`.
    #[must_use]
    pub fn with_destination(mut self, path: impl Into<PathBuf>) -> Self {
        self.destination = Some(path.into());
        self
    }

    /// Returns true when neither log is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.destination.is_none()
    }
}

/// In-memory batch for one top-level call.
#[derive(Debug)]
pub(crate) struct TransferLog<'a> {
    sink: &'a LogSink,
    sources: Vec<PathBuf>,
    destinations: Vec<PathBuf>,
}

impl<'a> TransferLog<'a> {
    pub(crate) fn new(sink: &'a LogSink) -> Self {
        Self {
            sink,
            sources: Vec::new(),
            destinations: Vec::new(),
        }
    }

    /// Records a successful source/destination pair.
    pub(crate) fn record(&mut self, source: &Path, destination: &Path) {
        if self.sink.source.is_some() {
            self.sources.push(source.to_path_buf());
        }
        if self.sink.destination.is_some() {
            self.destinations.push(destination.to_path_buf());
        }
    }

    /// Records a processed path that has no destination (deletes).
    pub(crate) fn record_source(&mut self, source: &Path) {
        if self.sink.source.is_some() {
            self.sources.push(source.to_path_buf());
        }
    }

    /// Appends everything recorded so far. Failures are logged, not returned.
    pub(crate) fn flush(self) {
        for (target, lines) in [
            (&self.sink.source, &self.sources),
            (&self.sink.destination, &self.destinations),
        ] {
            let Some(target) = target else {
                continue;
            };
            if lines.is_empty() {
                continue;
            }
            match append_lines(target, lines) {
                Ok(()) => debug!(log = %target.display(), lines = lines.len(), "appended transfer log"),
                Err(error) => warn!(log = %target.display(), %error, "failed to append transfer log"),
            }
        }
    }
}

fn append_lines(target: &Path, lines: &[PathBuf]) -> io::Result<()> {
    let _guard = LOG_WRITE_LOCK
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(parent) = target.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(target)?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{}", line.display())?;
    }
    writer.flush()
}
