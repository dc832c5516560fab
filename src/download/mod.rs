//! HTTP download to disk with temp-file commit.
//!
//! The body is streamed into `.<name>.tmp` beside the destination and only
//! renamed into place once complete and non-empty.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large files)
//! - Progress published to a [`TransferSignal`](crate::TransferSignal) when
//!   the server sends `Content-Length`
//! - Abort observed between chunks and while waiting for data
//! - 10s connect timeout and a stall timeout when no byte arrives
//! - Protected destinations redirected before the commit
//!
//! # Example
//!
//! ```no_run
//! use transfer_core::{Downloader, LogSink, TransferEngine, TransferSignal};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = Downloader::new(TransferEngine::default())?;
//! let signal = TransferSignal::new();
//! let path = downloader
//!     .fetch("https://example.com/pack.zip", Path::new("./downloads/"), &signal, &LogSink::none())
//!     .await?;
//! println!("Downloaded: {}", path.display());
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;

pub use client::Downloader;
pub use error::DownloadError;
