//! Error types for the download module.
//!
//! Every variant carries the URL or path it concerns so a single log line
//! is enough to diagnose a failed fetch.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::error::TransferError;

/// Errors that can occur while fetching a URL to disk.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The URL is malformed, still contains a `{placeholder}`, or has no file
    /// name to save under.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The rejected URL string.
        url: String,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Connecting or receiving response headers timed out.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// No body bytes arrived for the whole stall window.
    #[error("download of {url} stalled for {}s", .after.as_secs())]
    Stalled {
        /// The URL whose body stopped flowing.
        url: String,
        /// How long the transfer went without data.
        after: Duration,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error while writing the temp file.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The server answered with an empty body.
    #[error("empty response body from {url}")]
    Empty {
        /// The URL that returned no bytes.
        url: String,
    },

    /// The abort flag was raised during the transfer.
    #[error("download of {url} interrupted")]
    Interrupted {
        /// The URL being fetched.
        url: String,
    },

    /// The finished temp file could not be moved to its destination.
    #[error("failed to commit download to {path}: {source}")]
    Commit {
        /// Final destination path.
        path: PathBuf,
        /// The underlying move failure.
        #[source]
        source: TransferError,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    Client {
        /// The builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl DownloadError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a stall error.
    pub fn stalled(url: impl Into<String>, after: Duration) -> Self {
        Self::Stalled {
            url: url.into(),
            after,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an empty-body error.
    pub fn empty(url: impl Into<String>) -> Self {
        Self::Empty { url: url.into() }
    }

    /// Creates an interruption error.
    pub fn interrupted(url: impl Into<String>) -> Self {
        Self::Interrupted { url: url.into() }
    }

    /// Creates a commit error.
    pub fn commit(path: impl Into<PathBuf>, source: TransferError) -> Self {
        Self::Commit {
            path: path.into(),
            source,
        }
    }

    /// Returns true when the fetch stopped because of the abort flag.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}

// No `From<reqwest::Error>`/`From<std::io::Error>`: every variant needs the
// url or path, which the source errors do not carry.
