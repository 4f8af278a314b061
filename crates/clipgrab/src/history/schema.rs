//! `SQLite` schema definitions for the download history.

/// SQL statement to create the downloads table.
pub const CREATE_DOWNLOADS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS downloads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    kind TEXT NOT NULL,
    status TEXT NOT NULL,
    title TEXT,
    error TEXT,
    queued_at TEXT NOT NULL,
    finished_at TEXT
)
";

/// SQL statement to create an index on url for duplicate lookups.
pub const CREATE_URL_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_downloads_url ON downloads(url)
";

/// SQL statement to create an index on status for filtering.
pub const CREATE_STATUS_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_downloads_status ON downloads(status)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_DOWNLOADS_TABLE,
    CREATE_URL_INDEX,
    CREATE_STATUS_INDEX,
    CREATE_METADATA_TABLE,
];
