//! Processed-message ledger. A row here means the message id has been seen
//! by a sync run and must never be classified again, job-related or not.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::model::ProcessedMessage;

use super::DatabaseError;

/// Records a message as processed. Write-once: re-inserting an existing id
/// is a no-op and keeps the original row.
pub fn insert(conn: &Connection, marker: &ProcessedMessage) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO processed_messages (message_id, processed_at, was_job_related)
         VALUES (?1, ?2, ?3)",
        params![
            marker.message_id,
            marker.processed_at.to_rfc3339(),
            marker.was_job_related as i64,
        ],
    )?;
    Ok(())
}

pub fn is_processed(conn: &Connection, message_id: &str) -> Result<bool, DatabaseError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM processed_messages WHERE message_id = ?1",
            params![message_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Loads every processed message id into a set for in-memory membership
/// checks during a run.
pub fn load_all(conn: &Connection) -> Result<HashSet<String>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT message_id FROM processed_messages")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(ids)
}

pub fn count(conn: &Connection) -> Result<u64, DatabaseError> {
    let count: u64 = conn.query_row("SELECT COUNT(*) FROM processed_messages", [], |r| r.get(0))?;
    Ok(count)
}

pub fn count_job_related(conn: &Connection) -> Result<u64, DatabaseError> {
    let count: u64 = conn.query_row(
        "SELECT COUNT(*) FROM processed_messages WHERE was_job_related = 1",
        [],
        |r| r.get(0),
    )?;
    Ok(count)
}

/// Timestamp of the most recently processed message, if any.
pub fn last_processed_at(conn: &Connection) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    let latest = conn
        .query_row("SELECT MAX(processed_at) FROM processed_messages", [], |r| {
            let raw: Option<String> = r.get(0)?;
            raw.map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            0,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })
            })
            .transpose()
        })
        .optional()?
        .flatten();
    Ok(latest)
}
