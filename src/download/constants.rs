//! Constants for the download module.

use std::time::Duration;

/// How often the body loop wakes up to check the abort flag and the stall
/// window while waiting for the next chunk.
pub const ABORT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Prefix of the temp file written beside the destination.
pub const TEMP_PREFIX: &str = ".";

/// Suffix of the temp file written beside the destination.
pub const TEMP_SUFFIX: &str = ".tmp";
