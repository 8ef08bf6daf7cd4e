pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// How long a writer waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Open (or create) the activity database at the given path with schema
/// initialized and migrations applied.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // Enable WAL mode for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;

    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open a fully migrated in-memory database. Used by tests and ephemeral sessions.
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;
    Ok(conn)
}

/// Result of [`check_database_health`].
#[derive(Debug)]
pub struct HealthReport {
    pub schema_version: u32,
    pub activity_count: u64,
    pub collection_count: u64,
    pub pending_count: u64,
    pub integrity_ok: bool,
    pub integrity_details: String,
}

/// Run read-only diagnostics against an open database.
pub fn check_database_health(conn: &Connection) -> Result<HealthReport> {
    let schema_version = migrations::get_schema_version(conn)?;

    let activity_count: i64 =
        conn.query_row("SELECT COUNT(*) FROM activities", [], |row| row.get(0))?;
    let collection_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM (SELECT DISTINCT app_id, user_id FROM activities)",
        [],
        |row| row.get(0),
    )?;
    let pending_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM activities WHERE timestamp IS NULL",
        [],
        |row| row.get(0),
    )?;

    let integrity_details: String =
        conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;

    Ok(HealthReport {
        schema_version,
        activity_count: activity_count as u64,
        collection_count: collection_count as u64,
        pending_count: pending_count as u64,
        integrity_ok: integrity_details == "ok",
        integrity_details,
    })
}
