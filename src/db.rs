use std::path::Path;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;

use crate::error::{PlanAssignError, Result};

fn pragma_batch(busy_timeout_ms: u64) -> String {
    format!("PRAGMA busy_timeout = {busy_timeout_ms}; PRAGMA foreign_keys = ON;")
}

/// True for SQLite paths that open a private in-memory database. Each pooled
/// connection would get its own empty copy, so these cannot back a pool.
pub fn is_in_memory(path: &str) -> bool {
    let path = path.trim();
    path.is_empty()
        || path == ":memory:"
        || path.starts_with("file::memory:")
        || (path.starts_with("file:") && path.contains("mode=memory"))
}

pub fn ensure_parent_dir(path: &str) -> Result<()> {
    if is_in_memory(path) {
        return Ok(());
    }
    let path = Path::new(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PlanAssignError::Runtime(e.to_string()))?;
    }
    Ok(())
}

pub fn apply_pragmas_sync(conn: &mut SqliteConnection, busy_timeout_ms: u64) -> Result<()> {
    conn.batch_execute(&pragma_batch(busy_timeout_ms))
        .map_err(|e| PlanAssignError::Storage(e.to_string()))
}

pub fn open_connection_sync(database_url: &str, busy_timeout_ms: u64) -> Result<SqliteConnection> {
    let mut conn = SqliteConnection::establish(database_url)
        .map_err(|e| PlanAssignError::Storage(e.to_string()))?;
    apply_pragmas_sync(&mut conn, busy_timeout_ms)?;
    Ok(conn)
}

/// Foreign keys are off by default in SQLite and the setting is per
/// connection, so every pooled checkout goes through here.
pub async fn apply_pragmas_async(
    conn: &mut SyncConnectionWrapper<SqliteConnection>,
    busy_timeout_ms: u64,
) -> Result<()> {
    diesel_async::SimpleAsyncConnection::batch_execute(conn, &pragma_batch(busy_timeout_ms))
        .await
        .map_err(|e| PlanAssignError::Storage(e.to_string()))
}
