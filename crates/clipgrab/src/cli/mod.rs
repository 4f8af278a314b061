//! Command-line interface for clipgrab.
//!
//! This module provides the CLI structure for the `clipgrab` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CheckCommand, ConfigCommand, DownloadCommand, HistoryCommand, StatusCommand,
    DEFAULT_HISTORY_LIMIT,
};

/// clipgrab - Download YouTube links as you copy them
///
/// Watches the clipboard for YouTube links and downloads each one with
/// yt-dlp (or youtube-dl), one at a time. Runs the watcher when no command
/// is given.
#[derive(Debug, Parser)]
#[command(name = "clipgrab")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Watch the clipboard and download YouTube links (default)
    Watch,

    /// Download the given links, then exit
    Download(DownloadCommand),

    /// Show which link would be picked out of some text
    Check(CheckCommand),

    /// Show recent downloads
    History(HistoryCommand),

    /// Show downloader, paths and history status
    Status(StatusCommand),

    /// View or modify configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }

    /// Get the command to run, defaulting to `watch`.
    #[must_use]
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Watch)
    }
}
