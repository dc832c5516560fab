//! Engine tunables shared by the transfer, extract, and download components.

use std::time::Duration;

/// Default chunk size for single-file copies (16 KiB).
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 16 * 1024;

/// Default chunk size for reading archive entries (16 KiB).
pub const DEFAULT_EXTRACT_BUFFER_SIZE: usize = 16 * 1024;

/// Default capacity of the buffered writer behind extracted files (64 KiB).
pub const DEFAULT_EXTRACT_WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Default capacity of the buffered writer behind download temp files (16 KiB).
pub const DEFAULT_DOWNLOAD_BUFFER_SIZE: usize = 16 * 1024;

/// Default number of attempts when opening a copy source or destination.
pub const DEFAULT_OPEN_RETRIES: u32 = 3;

/// Default HTTP connect timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default stall timeout: abort when no byte arrives for this long (60 seconds).
pub const DEFAULT_STALL_TIMEOUT_SECS: u64 = 60;

/// Default suffix appended to protected destination names.
pub const DEFAULT_PROTECTED_SUFFIX: &str = ".new";

/// Tunables for every engine component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Chunk size for copying a single file.
    pub copy_buffer_size: usize,
    /// Chunk size for reading archive entries.
    pub extract_buffer_size: usize,
    /// Buffered writer capacity for extracted files.
    pub extract_write_buffer_size: usize,
    /// Buffered writer capacity for download temp files.
    pub download_buffer_size: usize,
    /// Attempts made to open a copy source/destination before giving up.
    pub open_retries: u32,
    /// HTTP connect timeout.
    pub connect_timeout: Duration,
    /// Abort a download when throughput stays at zero for this long.
    pub stall_timeout: Duration,
    /// Suffix appended to protected destination names.
    pub protected_suffix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            copy_buffer_size: DEFAULT_COPY_BUFFER_SIZE,
            extract_buffer_size: DEFAULT_EXTRACT_BUFFER_SIZE,
            extract_write_buffer_size: DEFAULT_EXTRACT_WRITE_BUFFER_SIZE,
            download_buffer_size: DEFAULT_DOWNLOAD_BUFFER_SIZE,
            open_retries: DEFAULT_OPEN_RETRIES,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            stall_timeout: Duration::from_secs(DEFAULT_STALL_TIMEOUT_SECS),
            protected_suffix: DEFAULT_PROTECTED_SUFFIX.to_string(),
        }
    }
}

impl EngineConfig {
    /// Returns a copy with zero-sized buffers and zero retries raised to 1.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.copy_buffer_size = self.copy_buffer_size.max(1);
        self.extract_buffer_size = self.extract_buffer_size.max(1);
        self.extract_write_buffer_size = self.extract_write_buffer_size.max(1);
        self.download_buffer_size = self.download_buffer_size.max(1);
        self.open_retries = self.open_retries.max(1);
        self
    }
}
