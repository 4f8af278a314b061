//! Logging configuration for clipgrab.
//!
//! This module provides initialization and configuration for the tracing-based
//! logging system used throughout clipgrab. Output always goes to the console;
//! a daily log file can be added alongside it.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crates whose events pass the default filter.
const LOG_TARGETS: &[&str] = &[
    "clipgrab",
    "clipgrab_linux",
    "clipgrab_mac",
    "clipgrab_windows",
];

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Suppress all output except errors.
    Quiet,
    /// Normal output level (info and above).
    #[default]
    Normal,
    /// Verbose output (debug and above).
    Verbose,
    /// Very verbose output (trace level).
    Trace,
}

impl Verbosity {
    /// Convert verbosity to tracing level filter.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }
}

/// Build the default filter directive for the given verbosity.
fn default_directive(verbosity: Verbosity) -> String {
    let level = verbosity.to_level_filter();
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Path of today's log file inside `log_dir`.
#[must_use]
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!(
        "auto_downloader_{}.log",
        Local::now().format("%Y%m%d")
    ))
}

/// Open (appending) today's log file, creating `log_dir` if needed.
fn open_log_file(log_dir: &Path) -> std::io::Result<(PathBuf, File)> {
    std::fs::create_dir_all(log_dir)?;
    let path = log_file_path(log_dir);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}

/// Initialize the logging system.
///
/// This should be called once at application startup. The logging level can be
/// controlled via:
/// 1. The `verbosity` parameter
/// 2. The `RUST_LOG` environment variable (takes precedence)
///
/// When `log_dir` is given, events are also appended to
/// `auto_downloader_YYYYMMDD.log` inside it. Returns the path of that file
/// if it could be opened.
///
/// # Examples
///
/// ```no_run
/// use clipgrab::{init_logging, logging::Verbosity};
///
/// // Console only
/// init_logging(Verbosity::Normal, None);
/// ```
pub fn init_logging(verbosity: Verbosity, log_dir: Option<&Path>) -> Option<PathBuf> {
    let default_filter = default_directive(verbosity);

    // Allow RUST_LOG to override
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let (log_path, file_error, file_layer) = match log_dir.map(open_log_file) {
        Some(Ok((path, file))) => {
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file));
            (Some(path), None, Some(layer))
        }
        Some(Err(e)) => (None, Some(e), None),
        None => (None, None, None),
    };

    // Configure the subscriber
    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .with(file_layer);

    // Install the subscriber (ignore error if already set)
    let _ = subscriber.try_init();

    if let Some(e) = file_error {
        tracing::warn!(error = %e, "Could not open log file, logging to console only");
    }

    log_path
}

/// Initialize logging for tests.
///
/// This sets up a minimal logging configuration suitable for tests.
/// It only logs warnings and errors by default to keep test output clean.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
