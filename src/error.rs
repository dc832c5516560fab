//! Error types shared by the transfer, extract, and path-resolution modules.
//!
//! The variants follow the failure taxonomy of the engine: a missing source,
//! an observed abort, a short read or write, an empty result, and OS-level
//! I/O failures that carry the path they happened on.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during copy, move, delete, and extract operations.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Source file, directory, or archive does not exist or cannot be opened.
    #[error("not found: {path}")]
    NotFound {
        /// The path that could not be opened.
        path: PathBuf,
    },

    /// The family abort flag was observed mid-operation.
    #[error("operation interrupted by abort request")]
    Interrupted,

    /// Bytes actually read or written differ from the expected count.
    #[error("truncated transfer for {path}: expected {expected} bytes, got {actual}")]
    Truncated {
        /// The file that came up short.
        path: PathBuf,
        /// Expected size in bytes.
        expected: u64,
        /// Actual size in bytes.
        actual: u64,
    },

    /// The operation produced nothing (e.g. an archive with no file entries).
    #[error("nothing to process in {path}")]
    Empty {
        /// The source that turned out to be empty.
        path: PathBuf,
    },

    /// File system error with an OS-level cause.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The ZIP container could not be parsed.
    #[error("archive error in {path}: {source}")]
    Archive {
        /// The archive path.
        path: PathBuf,
        /// The underlying archive error.
        #[source]
        source: zip::result::ZipError,
    },

    /// The path is not usable for the requested operation.
    #[error("invalid path: {path}")]
    InvalidPath {
        /// The offending path.
        path: PathBuf,
    },

    /// A delete pattern would remove a protected root or escape it.
    #[error("refusing dangerous pattern: {pattern}")]
    DangerousPattern {
        /// The rejected pattern.
        pattern: String,
    },
}

impl TransferError {
    /// Creates a not-found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates an IO error, promoting `ErrorKind::NotFound` to [`Self::NotFound`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::NotFound { path: path.into() };
        }
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a truncation error.
    pub fn truncated(path: impl Into<PathBuf>, expected: u64, actual: u64) -> Self {
        Self::Truncated {
            path: path.into(),
            expected,
            actual,
        }
    }

    /// Creates an empty-result error.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self::Empty { path: path.into() }
    }

    /// Creates an archive error.
    pub fn archive(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        Self::Archive {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid-path error.
    pub fn invalid_path(path: impl Into<PathBuf>) -> Self {
        Self::InvalidPath { path: path.into() }
    }

    /// Returns true when the error was caused by an abort request.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

// No From<std::io::Error>: every variant that wraps an OS error also needs the
// path it happened on, so callers go through the helper constructors.
