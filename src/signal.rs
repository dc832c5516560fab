//! Abort flags and progress registers shared between an operation and its
//! monitor.
//!
//! A [`TransferSignal`] pairs one abort flag with one progress register. The
//! running operation owns the writes to the register; any other thread may
//! read it and may request an abort. Nothing here blocks.
//!
//! Register values:
//! - `-1`: aborted or failed
//! - `0..=100`: in-progress or completed percentage, never decreasing while
//!   the operation is live
//!
//! Two concurrent operations must not share one signal. [`CancellationBus`]
//! bundles one signal per operation family for callers that want the
//! family-wide polling surface.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// Register value for an aborted or failed operation.
pub const FAILED: i32 = -1;

/// Register value for a completed operation.
pub const COMPLETE: i32 = 100;

/// Operation family; each family owns one signal on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Network downloads.
    Download,
    /// ZIP extraction.
    Extract,
    /// Copy, move, and delete.
    Copy,
}

impl Family {
    /// Returns the stable label used in log fields and CLI output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Extract => "extract",
            Self::Copy => "copy",
        }
    }
}

/// Abort flag plus progress register for one in-flight operation.
#[derive(Debug)]
pub struct TransferSignal {
    abort: AtomicBool,
    percent: AtomicI32,
}

impl Default for TransferSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferSignal {
    /// Creates an idle signal: no abort requested, register at `0`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            abort: AtomicBool::new(false),
            percent: AtomicI32::new(0),
        }
    }

    /// Requests cooperative cancellation of the running operation.
    pub fn request_abort(&self) {
        self.abort.store(true, Ordering::Release);
    }

    /// Returns true when an abort has been requested and not yet consumed.
    #[must_use]
    pub fn is_abort_requested(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    /// Current register value (`-1` or `0..=100`). May be slightly stale.
    #[must_use]
    pub fn percent(&self) -> i32 {
        self.percent.load(Ordering::Relaxed)
    }

    /// Resets the signal at the start of a top-level call.
    pub fn begin(&self) {
        self.abort.store(false, Ordering::Release);
        self.percent.store(0, Ordering::Release);
    }

    /// Raises the register to `value` if that is higher than the current
    /// value. A failed register stays failed.
    pub fn advance(&self, value: i32) {
        let value = value.clamp(0, COMPLETE);
        let _ = self
            .percent
            .fetch_update(Ordering::Release, Ordering::Relaxed, |current| {
                (current >= 0 && value > current).then_some(value)
            });
    }

    /// Publishes `floor(100 * done / total)`, clamped to `0..=100`.
    ///
    /// A zero `total` publishes nothing; completion sets `100` explicitly.
    pub fn advance_bytes(&self, done: u64, total: u64) {
        if total == 0 {
            return;
        }
        self.advance(percentage(done, total));
    }

    /// Marks the operation as completed (`100`).
    pub fn complete(&self) {
        self.percent.store(COMPLETE, Ordering::Release);
    }

    /// Marks the operation as aborted or failed (`-1`).
    pub fn fail(&self) {
        self.percent.store(FAILED, Ordering::Release);
    }

    /// Consumes a pending abort request, resetting the flag to `false`.
    ///
    /// Returns whether an abort had been requested.
    pub fn take_abort(&self) -> bool {
        self.abort.swap(false, Ordering::AcqRel)
    }
}

/// Computes `floor(100 * done / total)` without overflow, clamped to 100.
#[must_use]
pub fn percentage(done: u64, total: u64) -> i32 {
    if total == 0 {
        return 0;
    }
    let pct = (u128::from(done) * 100) / u128::from(total);
    // Clamped to 100 so the cast is lossless.
    #[allow(clippy::cast_possible_truncation)]
    let pct = pct.min(100) as i32;
    pct
}

/// One [`TransferSignal`] per operation family, created once and shared.
///
/// Same-family operations must be serialized by the caller; they share a
/// register and would otherwise corrupt each other's progress.
#[derive(Debug, Clone, Default)]
pub struct CancellationBus {
    download: Arc<TransferSignal>,
    extract: Arc<TransferSignal>,
    copy: Arc<TransferSignal>,
}

impl CancellationBus {
    /// Creates a bus with idle signals for all families.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the signal for `family`.
    #[must_use]
    pub fn signal(&self, family: Family) -> &Arc<TransferSignal> {
        match family {
            Family::Download => &self.download,
            Family::Extract => &self.extract,
            Family::Copy => &self.copy,
        }
    }

    /// Requests an abort on every family.
    pub fn abort_all(&self) {
        for family in [Family::Download, Family::Extract, Family::Copy] {
            self.signal(family).request_abort();
        }
    }
}
