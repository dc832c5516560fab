//! HTTP client wrapper that fetches one URL to a local path.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::constants::{ABORT_POLL_INTERVAL, TEMP_PREFIX, TEMP_SUFFIX};
use super::error::DownloadError;
use crate::paths::{base_name, has_trailing_separator};
use crate::error::TransferError;
use crate::signal::TransferSignal;
use crate::transfer::{LogSink, TransferEngine, TransferLog};
use crate::user_agent;

/// Downloads URLs to disk.
///
/// Created once and reused, so connections are pooled. The commit step goes
/// through the wrapped [`TransferEngine`], whose [`ProtectedPaths`] decide
/// where a reserved destination is redirected.
///
/// [`ProtectedPaths`]: crate::ProtectedPaths
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    engine: TransferEngine,
}

impl Downloader {
    /// Creates a downloader using the engine's tunables.
    ///
    /// Configuration:
    /// - Connect timeout and stall window from [`EngineConfig`](crate::EngineConfig)
    /// - Redirects followed (reqwest default policy)
    /// - Gzip decompression enabled
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Client`] when the HTTP client cannot be built.
    pub fn new(engine: TransferEngine) -> Result<Self, DownloadError> {
        let config = engine.config();
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.stall_timeout)
            .gzip(true)
            .user_agent(user_agent::default_download_user_agent())
            .build()
            .map_err(|source| DownloadError::Client { source })?;
        Ok(Self { client, engine })
    }

    /// Engine used for the final commit.
    #[must_use]
    pub fn engine(&self) -> &TransferEngine {
        &self.engine
    }

    /// Fetches `url` to `destination` and returns the path written.
    ///
    /// A `destination` ending in `/` is a directory; the last segment of the
    /// URL path is appended to it. The body goes to `.<name>.tmp` beside the
    /// final path, which is protected and committed with
    /// [`TransferEngine::move_file`] only when at least one byte arrived.
    ///
    /// The register is reset on entry, follows the received percentage when
    /// the length is known, and ends at `100` or `-1`. The abort flag is
    /// consumed before returning.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidUrl`] for malformed or templated URLs,
    /// [`DownloadError::Empty`] for a zero-byte body,
    /// [`DownloadError::Interrupted`] on abort, and the transport, status, and
    /// IO variants for everything else. The destination is never touched on
    /// error.
    #[instrument(skip(self, signal, log), fields(url = %url, destination = %destination.display()))]
    pub async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        signal: &TransferSignal,
        log: &LogSink,
    ) -> Result<PathBuf, DownloadError> {
        signal.begin();
        let result = self.fetch_inner(url, destination, signal, log).await;
        if let Err(error) = &result {
            signal.fail();
            warn!(%error, "download failed");
        }
        signal.take_abort();
        result
    }

    async fn fetch_inner(
        &self,
        url: &str,
        destination: &Path,
        signal: &TransferSignal,
        log: &LogSink,
    ) -> Result<PathBuf, DownloadError> {
        if url.contains(['{', '}']) {
            return Err(DownloadError::invalid_url(url));
        }
        let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let target = resolve_destination(&parsed, url, destination)?;
        if let Some(parent) = target.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent, e))?;
        }
        let temp = temp_path(&target).ok_or_else(|| DownloadError::invalid_url(url))?;
        debug!(temp = %temp.display(), "resolved temp path");

        let response = self.send(url, signal).await?;
        let content_length = response.content_length();

        let streamed = self
            .stream_to_file(response, url, &temp, content_length, signal)
            .await;
        let received = match streamed {
            Ok(received) => received,
            Err(error) => {
                debug!(path = %temp.display(), "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(&temp).await;
                return Err(error);
            }
        };

        let written = tokio::fs::metadata(&temp)
            .await
            .map(|meta| meta.len())
            .unwrap_or(received);
        if written == 0 {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(DownloadError::empty(url));
        }

        signal.complete();
        let final_path = self.engine.protected().protect(&target);
        let committed = self.commit(temp.clone(), final_path.clone(), url, log).await;
        if let Err(error) = committed {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(error);
        }

        info!(path = %final_path.display(), bytes = written, "download complete");
        Ok(final_path)
    }

    /// Renames the finished temp file into place and writes the logs, off the
    /// async worker threads.
    async fn commit(
        &self,
        temp: PathBuf,
        final_path: PathBuf,
        url: &str,
        log: &LogSink,
    ) -> Result<(), DownloadError> {
        let engine = self.engine.clone();
        let sink = log.clone();
        let source = PathBuf::from(url);
        let target = final_path.clone();
        let joined = tokio::task::spawn_blocking(move || {
            engine.move_file(&temp, &target, &LogSink::none())?;
            let mut batch = TransferLog::new(&sink);
            batch.record(&source, &target);
            batch.flush();
            Ok::<(), TransferError>(())
        })
        .await;

        match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(DownloadError::commit(final_path, error)),
            Err(error) => Err(DownloadError::io(final_path, io::Error::other(error))),
        }
    }

    /// Sends the GET, waking up every poll interval to honor the abort flag
    /// while the server is slow to answer.
    async fn send(
        &self,
        url: &str,
        signal: &TransferSignal,
    ) -> Result<reqwest::Response, DownloadError> {
        let stall_timeout = self.engine.config().stall_timeout;
        let started = Instant::now();
        let request = self.client.get(url).send();
        tokio::pin!(request);
        let sent = loop {
            if signal.is_abort_requested() {
                return Err(DownloadError::interrupted(url));
            }
            if let Ok(sent) = tokio::time::timeout(ABORT_POLL_INTERVAL, request.as_mut()).await {
                break sent;
            }
            let waited = started.elapsed();
            if waited >= stall_timeout {
                return Err(DownloadError::stalled(url, waited));
            }
        };
        let response = sent.map_err(|e| {
            if e.is_timeout() && e.is_connect() {
                DownloadError::timeout(url)
            } else if e.is_timeout() {
                DownloadError::stalled(url, stall_timeout)
            } else {
                DownloadError::network(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }

    /// Streams the response body into `temp`, returning bytes written.
    async fn stream_to_file(
        &self,
        response: reqwest::Response,
        url: &str,
        temp: &Path,
        content_length: Option<u64>,
        signal: &TransferSignal,
    ) -> Result<u64, DownloadError> {
        let stall_timeout = self.engine.config().stall_timeout;
        let file = File::create(temp)
            .await
            .map_err(|e| DownloadError::io(temp, e))?;
        let mut writer = BufWriter::with_capacity(self.engine.config().download_buffer_size, file);
        let mut stream = response.bytes_stream();
        let mut received: u64 = 0;
        let mut last_data = Instant::now();

        loop {
            if signal.is_abort_requested() {
                return Err(DownloadError::interrupted(url));
            }
            let next = match tokio::time::timeout(ABORT_POLL_INTERVAL, stream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    let idle = last_data.elapsed();
                    if idle >= stall_timeout {
                        return Err(DownloadError::stalled(url, idle));
                    }
                    continue;
                }
            };
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk.map_err(|e| {
                if e.is_timeout() {
                    DownloadError::stalled(url, stall_timeout)
                } else {
                    DownloadError::network(url, e)
                }
            })?;

            writer
                .write_all(&chunk)
                .await
                .map_err(|e| DownloadError::io(temp, e))?;
            if !chunk.is_empty() {
                last_data = Instant::now();
            }
            received += chunk.len() as u64;
            if let Some(total) = content_length {
                signal.advance_bytes(received, total);
            }
        }

        writer
            .flush()
            .await
            .map_err(|e| DownloadError::io(temp, e))?;
        Ok(received)
    }
}

/// Final path for `destination`: as given, or `destination/<last url segment>`
/// when it ends in `/`.
fn resolve_destination(
    parsed: &Url,
    url: &str,
    destination: &Path,
) -> Result<PathBuf, DownloadError> {
    if !has_trailing_separator(destination) {
        return Ok(destination.to_path_buf());
    }
    let name = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| DownloadError::invalid_url(url))?;
    Ok(destination.join(name))
}

/// `.<name>.tmp` beside `target`.
fn temp_path(target: &Path) -> Option<PathBuf> {
    let name = base_name(target)?;
    let temp_name = format!("{TEMP_PREFIX}{name}{TEMP_SUFFIX}");
    Some(match target.parent() {
        Some(parent) => parent.join(temp_name),
        None => PathBuf::from(temp_name),
    })
}
