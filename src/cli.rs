//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use transfer_core::MirrorMode;

/// Progress-tracked, cancellable bulk file transfer.
///
/// Downloads, unzips, copies, moves, and deletes files and directory trees,
/// optionally selected by wildcard patterns. A trailing `/` marks a path as a
/// directory. Press Ctrl-C to abort the running operation cleanly.
#[derive(Parser, Debug)]
#[command(name = "transfer")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Hide the progress bar
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Config file (default: $XDG_CONFIG_HOME/transfer/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Append every processed source path to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_source: Option<PathBuf>,

    /// Append every written destination path to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_destination: Option<PathBuf>,

    /// Destination path that must never be overwritten (repeatable)
    #[arg(long = "protect", global = true, value_name = "PATH")]
    pub protect: Vec<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Operations.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download a URL to a file, or into a directory when DEST ends in `/`
    Download {
        /// URL to fetch
        url: String,
        /// Destination file or directory
        destination: PathBuf,
    },

    /// Extract a ZIP archive
    Unzip {
        /// Archive to read
        archive: PathBuf,
        /// Directory to extract into
        destination: PathBuf,
    },

    /// Copy a file or directory tree
    Copy {
        /// Source path, or a wildcard pattern with --pattern
        source: String,
        /// Destination path
        destination: PathBuf,
        /// Treat SOURCE as a wildcard pattern and copy every match into DEST
        #[arg(short, long)]
        pattern: bool,
    },

    /// Move a file or directory tree
    Move {
        /// Source path, or a wildcard pattern with --pattern
        source: String,
        /// Destination path
        destination: PathBuf,
        /// Treat SOURCE as a wildcard pattern and move every match into DEST
        #[arg(short, long)]
        pattern: bool,
    },

    /// Delete a file, or a directory tree when TARGET ends in `/`
    Delete {
        /// Path, or a wildcard pattern with --pattern
        target: String,
        /// Treat TARGET as a wildcard pattern and delete every match
        #[arg(short, long)]
        pattern: bool,
    },

    /// Print the paths a wildcard pattern matches
    Resolve {
        /// Pattern such as `/sd/switch/*/config/*.ini`
        pattern: String,
        /// Sort matches instead of using directory order
        #[arg(short, long)]
        sort: bool,
    },

    /// Print the total size in bytes of files and directory trees
    Size {
        /// Paths to measure
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Copy or delete the counterpart of every file under SOURCE in TARGET
    Mirror {
        /// Directory whose files are enumerated
        source: PathBuf,
        /// Directory receiving (or losing) the counterparts
        target: PathBuf,
        /// What to do with each counterpart
        #[arg(short, long, value_enum, default_value_t = MirrorArg::Copy)]
        mode: MirrorArg,
    },
}

/// Command-line spelling of [`MirrorMode`].
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MirrorArg {
    Copy,
    Delete,
}

impl From<MirrorArg> for MirrorMode {
    fn from(value: MirrorArg) -> Self {
        match value {
            MirrorArg::Copy => Self::Copy,
            MirrorArg::Delete => Self::Delete,
        }
    }
}
