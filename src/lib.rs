//! Transfer Core Library
//!
//! Progress-tracked, cancellable bulk file transfer: network download to disk,
//! ZIP extraction, and recursive copy/move/delete over wildcard-resolved path
//! sets. Every operation shares one cancellation/progress protocol
//! ([`TransferSignal`]) and one protected-path safety net ([`ProtectedPaths`]).
//!
//! # Architecture
//!
//! - [`matcher`] - Glob pattern to concrete path resolution
//! - [`size`] - Total byte size of files and directory trees
//! - [`signal`] - Abort flags and progress registers
//! - [`policy`] - Protected destination paths and dangerous-pattern guard
//! - [`transfer`] - Chunked copy, tree copy/move, iterative delete
//! - [`download`] - HTTP download with temp-file commit
//! - [`extract`] - Two-pass ZIP extraction
//!
//! All operations run synchronously on the caller's thread (the download is
//! an `async fn` awaited by the caller). Another thread may poll a
//! [`TransferSignal`] and request an abort at any time.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
mod error;
pub mod extract;
pub mod matcher;
pub mod paths;
pub mod policy;
pub mod signal;
pub mod size;
pub mod transfer;
mod user_agent;
mod walk;

// Re-export commonly used types
pub use config::EngineConfig;
pub use download::{DownloadError, Downloader};
pub use error::TransferError;
pub use extract::{ExtractSummary, Extractor};
pub use matcher::resolve;
pub use policy::ProtectedPaths;
pub use signal::{CancellationBus, Family, TransferSignal};
pub use size::total_size;
pub use transfer::{LogSink, MirrorMode, TransferEngine, TransferSummary};
