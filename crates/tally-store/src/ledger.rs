//! Append-only attendance ledger.

use crate::StoreError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::params;
use tally_core::{AttendanceEvent, AttendanceStatus};
use tokio_rusqlite::Connection;

/// SQLite-backed event ledger. Cheap to clone; clones share the
/// underlying connection.
#[derive(Clone)]
pub struct AttendanceLedger {
    conn: Connection,
}

impl AttendanceLedger {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Append one event. Never updates or deletes existing rows.
    pub async fn append(&self, event: &AttendanceEvent) -> Result<(), StoreError> {
        let identity_id = event.identity_id.clone();
        let timestamp = format_timestamp(&event.timestamp);
        let status = event.status.as_str();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO attendance (identity_id, timestamp, status)
                     VALUES (?1, ?2, ?3)",
                    params![identity_id, timestamp, status],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// The most recent event for an identity.
    ///
    /// Ordered by timestamp descending; row id breaks exact-timestamp ties
    /// in favor of the later append.
    pub async fn most_recent_for(
        &self,
        identity_id: &str,
    ) -> Result<Option<AttendanceEvent>, StoreError> {
        let id = identity_id.to_string();
        let row: Option<(String, String, String)> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT identity_id, timestamp, status FROM attendance
                     WHERE identity_id = ?1
                     ORDER BY timestamp DESC, id DESC
                     LIMIT 1",
                )?;
                let row = stmt
                    .query_map(params![id], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                    })?
                    .next()
                    .transpose()?;
                Ok(row)
            })
            .await?;

        row.map(|(identity_id, ts, status)| parse_event(identity_id, &ts, &status))
            .transpose()
    }

    /// Up to `limit` events, newest first, with display names joined in.
    /// The name is `None` for events whose identity record is missing.
    pub async fn recent(
        &self,
        limit: u32,
    ) -> Result<Vec<(AttendanceEvent, Option<String>)>, StoreError> {
        let rows: Vec<(String, String, String, Option<String>)> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT a.identity_id, a.timestamp, a.status, i.display_name
                     FROM attendance a
                     LEFT JOIN identities i ON i.id = a.identity_id
                     ORDER BY a.timestamp DESC, a.id DESC
                     LIMIT ?1",
                )?;
                let rows = stmt
                    .query_map(params![limit], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                    })?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(rows)
            })
            .await?;

        rows.into_iter()
            .map(|(identity_id, ts, status, name)| {
                Ok((parse_event(identity_id, &ts, &status)?, name))
            })
            .collect()
    }
}

/// Fixed-width RFC 3339 UTC so lexicographic text order is chronological.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_event(identity_id: String, ts: &str, status: &str) -> Result<AttendanceEvent, StoreError> {
    let timestamp = DateTime::parse_from_rfc3339(ts)
        .map_err(|e| StoreError::Corrupt(format!("timestamp {ts:?}: {e}")))?
        .with_timezone(&Utc);
    let status = AttendanceStatus::parse(status)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown status {status:?}")))?;
    Ok(AttendanceEvent { identity_id, timestamp, status })
}
