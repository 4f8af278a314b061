//! Download history for clipgrab.
//!
//! This module provides `SQLite`-based persistent storage of every queued
//! link and what became of it, so finished downloads can be skipped in later
//! sessions and listed from the command line.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::links::{LinkKind, YoutubeLink};

/// Where a download is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    /// Waiting in the queue.
    Queued,
    /// The downloader is running.
    Downloading,
    /// Finished successfully.
    Completed,
    /// The downloader reported an error.
    Failed,
    /// The program stopped before the download finished.
    Abandoned,
}

impl DownloadStatus {
    /// Parse a status from its stored name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "queued" => Some(Self::Queued),
            "downloading" => Some(Self::Downloading),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "abandoned" => Some(Self::Abandoned),
            _ => None,
        }
    }
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Downloading => write!(f, "downloading"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// One row of the download history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    /// Row identifier.
    pub id: i64,
    /// The queued URL.
    pub url: String,
    /// The link shape.
    pub kind: LinkKind,
    /// Current status.
    pub status: DownloadStatus,
    /// Video title, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Error message of a failed download.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the link was queued.
    pub queued_at: DateTime<Utc>,
    /// When the download reached a final state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Persistent record of queued and finished downloads.
#[derive(Debug)]
pub struct History {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl History {
    /// Open or create a history database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening history database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        debug!("History database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory history for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a newly queued link and return its row id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn record_queued(&self, link: &YoutubeLink) -> Result<i64> {
        self.conn.execute(
            r"
            INSERT INTO downloads (url, kind, status, queued_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![
                link.url,
                link.kind.to_string(),
                DownloadStatus::Queued.to_string(),
                Utc::now().to_rfc3339(),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!(id, url = %link.url, "Recorded queued download");
        Ok(id)
    }

    /// Mark a download as started.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn mark_downloading(&self, id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE downloads SET status = ?1 WHERE id = ?2",
            params![DownloadStatus::Downloading.to_string(), id],
        )?;
        Ok(())
    }

    /// Mark a download as finished successfully.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn mark_completed(&self, id: i64, title: Option<&str>) -> Result<()> {
        self.conn.execute(
            "UPDATE downloads SET status = ?1, title = ?2, finished_at = ?3 WHERE id = ?4",
            params![
                DownloadStatus::Completed.to_string(),
                title,
                Utc::now().to_rfc3339(),
                id
            ],
        )?;
        Ok(())
    }

    /// Mark a download as failed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn mark_failed(&self, id: i64, error: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE downloads SET status = ?1, error = ?2, finished_at = ?3 WHERE id = ?4",
            params![
                DownloadStatus::Failed.to_string(),
                error,
                Utc::now().to_rfc3339(),
                id
            ],
        )?;
        Ok(())
    }

    /// Mark every unfinished download as abandoned.
    ///
    /// Used at startup for rows left behind by a session that ended abruptly,
    /// and at shutdown for links that never got their turn. Returns the number
    /// of rows updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn mark_abandoned_pending(&self) -> Result<usize> {
        let affected = self.conn.execute(
            "UPDATE downloads SET status = ?1, finished_at = ?2 WHERE status IN (?3, ?4)",
            params![
                DownloadStatus::Abandoned.to_string(),
                Utc::now().to_rfc3339(),
                DownloadStatus::Queued.to_string(),
                DownloadStatus::Downloading.to_string(),
            ],
        )?;

        if affected > 0 {
            info!("Marked {} unfinished downloads as abandoned", affected);
        }
        Ok(affected)
    }

    /// Get a record by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: i64) -> Result<Option<DownloadRecord>> {
        let result = self
            .conn
            .query_row(
                r"
                SELECT id, url, kind, status, title, error, queued_at, finished_at
                FROM downloads WHERE id = ?1
                ",
                [id],
                Self::row_to_record,
            )
            .optional()?;
        Ok(result)
    }

    /// Get the most recently queued records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn recent(&self, limit: usize) -> Result<Vec<DownloadRecord>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, url, kind, status, title, error, queued_at, finished_at
            FROM downloads ORDER BY id DESC LIMIT ?1
            ",
        )?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map([limit_i64], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Get every URL that was downloaded successfully.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn completed_urls(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT url FROM downloads WHERE status = ?1")?;

        let urls = stmt
            .query_map([DownloadStatus::Completed.to_string()], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(urls)
    }

    /// Count records in a given status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_by_status(&self, status: DownloadStatus) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM downloads WHERE status = ?1",
            [status.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Count all records.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM downloads", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get history statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<HistoryStats> {
        let last_completed: Option<String> = self
            .conn
            .query_row(
                "SELECT MAX(finished_at) FROM downloads WHERE status = ?1",
                [DownloadStatus::Completed.to_string()],
                |row| row.get(0),
            )
            .optional()?
            .flatten();

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(HistoryStats {
            total: self.count()?,
            completed: self.count_by_status(DownloadStatus::Completed)?,
            failed: self.count_by_status(DownloadStatus::Failed)?,
            abandoned: self.count_by_status(DownloadStatus::Abandoned)?,
            last_completed: last_completed.as_deref().and_then(parse_timestamp),
            db_size_bytes,
        })
    }

    /// Convert a database row to a `DownloadRecord`.
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<DownloadRecord> {
        let kind_str: String = row.get(2)?;
        let status_str: String = row.get(3)?;
        let queued_at: String = row.get(6)?;
        let finished_at: Option<String> = row.get(7)?;

        let kind = LinkKind::from_name(&kind_str).unwrap_or_else(|| {
            warn!("Unknown link kind: {}, defaulting to watch", kind_str);
            LinkKind::Watch
        });
        let status = DownloadStatus::from_name(&status_str).unwrap_or_else(|| {
            warn!("Unknown status: {}, defaulting to abandoned", status_str);
            DownloadStatus::Abandoned
        });

        Ok(DownloadRecord {
            id: row.get(0)?,
            url: row.get(1)?,
            kind,
            status,
            title: row.get(4)?,
            error: row.get(5)?,
            queued_at: parse_timestamp(&queued_at).unwrap_or_else(Utc::now),
            finished_at: finished_at.as_deref().and_then(parse_timestamp),
        })
    }
}

/// Parse a stored RFC 3339 timestamp.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Statistics about the download history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    /// Total number of records.
    pub total: i64,
    /// Successful downloads.
    pub completed: i64,
    /// Failed downloads.
    pub failed: i64,
    /// Downloads cut short by shutdown.
    pub abandoned: i64,
    /// When the most recent successful download finished.
    pub last_completed: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
