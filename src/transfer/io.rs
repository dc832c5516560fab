//! Buffered stream plumbing shared by copy and extract.

use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::signal::TransferSignal;

/// Base delay between open attempts; grows linearly per attempt.
const OPEN_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Output file that is removed on drop unless [`PartialFile::commit`] ran.
///
/// Covers every early return (error, abort, panic unwind) with the same
/// cleanup.
#[derive(Debug)]
pub(crate) struct PartialFile {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl PartialFile {
    /// Creates (truncates) `path` behind a writer of `capacity` bytes.
    pub(crate) fn create(path: &Path, capacity: usize) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(BufWriter::with_capacity(capacity, file)),
        })
    }

    /// Flushes buffered bytes and keeps the file.
    pub(crate) fn commit(mut self) -> io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Write for PartialFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.writer.as_mut() {
            Some(writer) => writer.write(buf),
            None => Err(io::Error::other("partial file already committed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        // Committed files have no writer left.
        if let Some(writer) = self.writer.take() {
            drop(writer);
            if let Err(error) = std::fs::remove_file(&self.path) {
                debug!(path = %self.path.display(), %error, "failed to remove partial output");
            } else {
                debug!(path = %self.path.display(), "removed partial output");
            }
        }
    }
}

/// Why [`pump`] stopped early.
#[derive(Debug)]
pub(crate) enum PumpError {
    Interrupted,
    Read(io::Error),
    Write(io::Error),
}

/// Streams `reader` into `writer` through `buffer`.
///
/// The abort flag is checked before every read and after every write;
/// `on_chunk` sees the size of each chunk written. Returns the total number
/// of bytes moved.
pub(crate) fn pump<R, W>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut [u8],
    signal: &TransferSignal,
    mut on_chunk: impl FnMut(u64),
) -> Result<u64, PumpError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut moved = 0_u64;
    loop {
        if signal.is_abort_requested() {
            return Err(PumpError::Interrupted);
        }
        let read = match reader.read(buffer) {
            Ok(0) => return Ok(moved),
            Ok(read) => read,
            Err(error) if error.kind() == ErrorKind::Interrupted => continue,
            Err(error) => return Err(PumpError::Read(error)),
        };
        writer
            .write_all(&buffer[..read])
            .map_err(PumpError::Write)?;
        moved += read as u64;
        on_chunk(read as u64);
        if signal.is_abort_requested() {
            return Err(PumpError::Interrupted);
        }
    }
}

/// Runs `open` up to `attempts` times. Missing files fail immediately.
pub(crate) fn open_with_retries<T>(
    path: &Path,
    attempts: u32,
    mut open: impl FnMut(&Path) -> io::Result<T>,
) -> io::Result<T> {
    let mut attempt = 1;
    loop {
        match open(path) {
            Ok(value) => return Ok(value),
            Err(error) if attempt < attempts && error.kind() != ErrorKind::NotFound => {
                debug!(path = %path.display(), attempt, %error, "open failed; retrying");
                thread::sleep(OPEN_RETRY_DELAY * attempt);
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
