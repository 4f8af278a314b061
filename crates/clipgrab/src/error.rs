//! Error types for clipgrab.
//!
//! This module defines all error types used throughout the clipgrab crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for clipgrab operations.
#[derive(Error, Debug)]
pub enum Error {
    // === History Errors ===
    /// Failed to open or create the history database.
    #[error("failed to open history database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Clipboard Errors ===
    /// The clipboard could not be read.
    #[error("clipboard access failed: {0}")]
    Clipboard(String),

    // === Download Errors ===
    /// Neither `yt-dlp` nor `youtube-dl` could be found.
    #[error("no downloader found: install yt-dlp (or youtube-dl) and make sure it is on PATH")]
    DownloaderMissing,

    /// The downloader ran but the download failed.
    #[error("download of {url} failed: {message}")]
    Download {
        /// The URL that was being downloaded.
        url: String,
        /// Description of what went wrong.
        message: String,
    },

    /// Text handed to the queue did not contain a recognised link.
    #[error("not a YouTube link: {0}")]
    NotALink(String),

    /// The download queue is no longer accepting work.
    #[error("download queue is shut down")]
    QueueClosed,

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for clipgrab operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new clipboard error.
    #[must_use]
    pub fn clipboard(message: impl Into<String>) -> Self {
        Self::Clipboard(message.into())
    }

    /// Create a new download error.
    #[must_use]
    pub fn download(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Download {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error means no downloader is installed.
    #[must_use]
    pub fn is_downloader_missing(&self) -> bool {
        matches!(self, Self::DownloaderMissing)
    }
}
