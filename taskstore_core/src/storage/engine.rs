use std::fs;
use std::path::Path;

use rusqlite::Connection;
use tracing::debug;

use crate::error::{Result, StoreError};

/// Opens the SQLite file backing a store, creating its directory if needed.
pub fn open_connection(path: &Path, cached_statements: usize) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| {
            StoreError::StorageUnavailable(format!(
                "Failed to create database directory '{}': {e}",
                dir.display()
            ))
        })?;
    }
    let conn = Connection::open(path)?;
    conn.set_prepared_statement_cache_capacity(cached_statements);
    debug!(path = %path.display(), cached_statements, "opened task database");
    Ok(conn)
}
