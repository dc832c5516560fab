//! Progress bar that polls a [`TransferSignal`] register.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use transfer_core::TransferSignal;

/// Spawns the progress bar when requested.
/// Returns (handle, stop) so the caller can signal stop and await the handle.
/// When `enabled` is false, returns (None, stop) with stop already true.
pub(crate) fn spawn_progress_ui(
    enabled: bool,
    signal: Arc<TransferSignal>,
    label: &'static str,
) -> (Option<tokio::task::JoinHandle<()>>, Arc<AtomicBool>) {
    if !enabled {
        return (None, Arc::new(AtomicBool::new(true)));
    }
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_bar_inner(signal, label, Arc::clone(&stop));
    (Some(handle), stop)
}

fn spawn_bar_inner(
    signal: Arc<TransferSignal>,
    label: &'static str,
    stop: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{msg:>10} [{bar:40}] {pos:>3}%")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message(label);

        while !stop.load(Ordering::SeqCst) {
            // -1 means failed; keep the last position on screen.
            if let Ok(percent) = u64::try_from(signal.percent()) {
                bar.set_position(percent);
            }
            tokio::time::sleep(Duration::from_millis(120)).await;
        }

        bar.finish_and_clear();
    })
}

/// Stops the bar and waits for it to clear.
pub(crate) async fn stop_progress_ui(
    handle: Option<tokio::task::JoinHandle<()>>,
    stop: &AtomicBool,
) {
    stop.store(true, Ordering::SeqCst);
    if let Some(handle) = handle {
        let _ = handle.await;
    }
}
