//! CLI entry point for the transfer tool.

use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use transfer_core::{
    CancellationBus, Downloader, EngineConfig, Extractor, Family, LogSink, ProtectedPaths,
    TransferEngine, TransferError, TransferSignal, matcher, size,
};

mod app_config;
mod cli;
mod progress;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let loaded = app_config::load_file_config_from(args.config.as_deref())?;
    let file_config = loaded.config.unwrap_or_default();
    if let Some(path) = &loaded.path {
        debug!(path = %path.display(), "config path resolved");
    }

    let mut config = EngineConfig::default();
    file_config.apply(&mut config);
    let protected = ProtectedPaths::new(config.protected_suffix.clone())
        .with_paths(file_config.protected_paths.iter().cloned())
        .with_paths(args.protect.iter().cloned());
    let engine = TransferEngine::new(config, protected);

    let log = LogSink {
        source: args.log_source.clone().or(file_config.log_source),
        destination: args.log_destination.clone().or(file_config.log_destination),
    };

    let bus = CancellationBus::new();
    spawn_ctrl_c_handler(bus.clone());

    let show_progress = !args.quiet && !args.no_progress && io::stderr().is_terminal();
    let ctx = RunContext {
        engine,
        log,
        bus,
        show_progress,
    };
    ctx.dispatch(args.command).await
}

/// Raises every abort flag on the first Ctrl-C.
fn spawn_ctrl_c_handler(bus: CancellationBus) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; aborting");
            bus.abort_all();
        }
    });
}

struct RunContext {
    engine: TransferEngine,
    log: LogSink,
    bus: CancellationBus,
    show_progress: bool,
}

impl RunContext {
    async fn dispatch(&self, command: Command) -> Result<()> {
        match command {
            Command::Resolve { pattern, sort } => {
                let mut matches = matcher::resolve(&pattern);
                if sort {
                    matches.sort();
                }
                for path in &matches {
                    println!("{}", path.display());
                }
                info!(matches = matches.len(), "resolve complete");
                Ok(())
            }
            Command::Size { paths } => {
                println!("{}", size::total_size_of(&paths));
                Ok(())
            }
            Command::Download { url, destination } => self.download(&url, &destination).await,
            Command::Unzip {
                archive,
                destination,
            } => {
                let extractor = Extractor::from_engine(&self.engine);
                let summary = self
                    .run_blocking(Family::Extract, "unzip", move |signal| {
                        extractor.unzip(&archive, &destination, signal)
                    })
                    .await?;
                info!(files = summary.files, failed = summary.failed, "unzip finished");
                Ok(())
            }
            Command::Copy {
                source,
                destination,
                pattern,
            } => {
                let engine = self.engine.clone();
                let log = self.log.clone();
                let summary = self
                    .run_blocking(Family::Copy, "copy", move |signal| {
                        if pattern {
                            engine.copy_by_pattern(&source, &destination, signal, &log)
                        } else {
                            engine.copy_file_or_directory(
                                Path::new(&source),
                                &destination,
                                signal,
                                &log,
                            )
                        }
                    })
                    .await?;
                info!(
                    files = summary.files,
                    failed = summary.failed,
                    bytes = summary.bytes,
                    "copy finished"
                );
                Ok(())
            }
            Command::Move {
                source,
                destination,
                pattern,
            } => {
                let engine = self.engine.clone();
                let log = self.log.clone();
                let summary = self
                    .run_blocking(Family::Copy, "move", move |signal| {
                        if pattern {
                            engine.move_by_pattern(&source, &destination, signal, &log)
                        } else {
                            engine.move_file_or_directory(
                                Path::new(&source),
                                &destination,
                                signal,
                                &log,
                            )
                        }
                    })
                    .await?;
                info!(files = summary.files, failed = summary.failed, "move finished");
                Ok(())
            }
            Command::Delete { target, pattern } => {
                let engine = self.engine.clone();
                let log = self.log.clone();
                let summary = self
                    .run_blocking(Family::Copy, "delete", move |signal| {
                        if pattern {
                            engine.delete_by_pattern(&target, signal, &log)
                        } else {
                            engine.delete_file_or_directory(Path::new(&target), signal, &log)
                        }
                    })
                    .await?;
                info!(files = summary.files, failed = summary.failed, "delete finished");
                Ok(())
            }
            Command::Mirror {
                source,
                target,
                mode,
            } => {
                let engine = self.engine.clone();
                let log = self.log.clone();
                let summary = self
                    .run_blocking(Family::Copy, "mirror", move |signal| {
                        engine.mirror(&source, &target, mode.into(), signal, &log)
                    })
                    .await?;
                info!(files = summary.files, failed = summary.failed, "mirror finished");
                Ok(())
            }
        }
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<()> {
        let signal = Arc::clone(self.bus.signal(Family::Download));
        let downloader = Downloader::new(self.engine.clone())?;
        let (handle, stop) =
            progress::spawn_progress_ui(self.show_progress, Arc::clone(&signal), "download");
        let result = downloader.fetch(url, destination, &signal, &self.log).await;
        progress::stop_progress_ui(handle, &stop).await;

        let path = result.with_context(|| format!("download of {url} failed"))?;
        println!("{}", path.display());
        Ok(())
    }

    /// Runs a synchronous operation on the blocking pool while the progress
    /// bar polls the family register.
    async fn run_blocking<T, F>(
        &self,
        family: Family,
        label: &'static str,
        operation: F,
    ) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&TransferSignal) -> Result<T, TransferError> + Send + 'static,
    {
        let signal = Arc::clone(self.bus.signal(family));
        let (handle, stop) =
            progress::spawn_progress_ui(self.show_progress, Arc::clone(&signal), label);
        let worker = Arc::clone(&signal);
        let joined = tokio::task::spawn_blocking(move || operation(&worker)).await;
        progress::stop_progress_ui(handle, &stop).await;

        let outcome = joined.with_context(|| format!("{label} worker panicked"))?;
        outcome.with_context(|| format!("{label} failed"))
    }
}
