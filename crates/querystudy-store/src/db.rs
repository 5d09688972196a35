//! Database connection management
//!
//! Provides utilities for opening and configuring SQLite connections

use crate::errors::{from_rusqlite, Result};
use rusqlite::Connection;
use std::path::Path;

/// Open a SQLite database at the given path
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(from_rusqlite)
}

/// Open an in-memory SQLite database
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Apply connection settings
///
/// WAL journaling is only requested for file-backed databases; in-memory
/// databases always report `memory`.
pub fn configure(conn: &Connection, foreign_keys: bool, file_backed: bool) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", foreign_keys)
        .map_err(from_rusqlite)?;

    if file_backed {
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(from_rusqlite)?;
        tracing::debug!(journal_mode = %mode, "configured journal mode");
    }

    Ok(())
}
