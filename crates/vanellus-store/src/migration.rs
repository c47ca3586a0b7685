//! Settings schema for SQLite.
//!
//! Schema versions are recorded in `schema_migrations`; `MIGRATIONS[n]` takes
//! the schema from version `n` to `n + 1`.

use rusqlite::{params, Connection};

use crate::error::{Result, StoreError};

/// Schema steps, oldest first.
const MIGRATIONS: &[&str] = &[
    // v1: opaque values keyed by name
    r#"
    CREATE TABLE settings (
        key TEXT PRIMARY KEY,
        value BLOB NOT NULL,
        updated_at INTEGER NOT NULL      -- Unix ms
    );
    "#,
];

/// Current schema version.
pub const CURRENT_VERSION: u32 = MIGRATIONS.len() as u32;

/// Bring the schema up to [`CURRENT_VERSION`]. Safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database is at schema v{}, newer than supported v{}",
            current, CURRENT_VERSION
        )));
    }
    if current == CURRENT_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (index, sql) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        tx.execute_batch(sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![index as u32 + 1, now_millis()],
        )?;
    }
    tx.commit()?;

    tracing::debug!(from = current, to = CURRENT_VERSION, "migrated settings schema");
    Ok(())
}

pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
