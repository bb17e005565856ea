//! Database open and schema initialization.

use crate::StoreError;
use std::path::Path;
use tokio_rusqlite::Connection;

/// Open (or create) the database at `path` and ensure the schema exists.
pub async fn open(path: &Path) -> Result<Connection, StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path).await?;
    init_schema(&conn).await?;
    tracing::info!(path = %path.display(), "database opened");
    Ok(conn)
}

/// In-memory database with the full schema. Used by tests and ephemeral runs.
pub async fn open_in_memory() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory().await?;
    init_schema(&conn).await?;
    Ok(conn)
}

/// Idempotent schema creation.
///
/// The attendance table is append-only by convention: nothing in this crate
/// issues UPDATE or DELETE against it. Storage stays trusting — no foreign
/// key enforcement, no status check constraint.
async fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.call(|conn| {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS identities (
                id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                embedding TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS attendance (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                identity_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                status TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_attendance_identity_timestamp
                ON attendance(identity_id, timestamp DESC);",
        )?;
        Ok(())
    })
    .await?;
    Ok(())
}
