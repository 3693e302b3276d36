//! Application record repository — CRUD over the `applications` and
//! `status_changes` tables.
//!
//! Functions take a `&Connection` so the checkpoint can compose them inside
//! one transaction; callers outside a transaction go through
//! `Database::with_conn`.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::model::{ApplicationRecord, StatusChange, StatusSource};
use crate::status::Status;

use super::DatabaseError;

fn map_record(row: &Row<'_>) -> rusqlite::Result<ApplicationRecord> {
    Ok(ApplicationRecord {
        id: Some(row.get(0)?),
        company: row.get(1)?,
        job_title: row.get(2)?,
        location: row.get(3)?,
        status: status_from_sql(4, row.get::<_, String>(4)?)?,
        applied_date: datetime_from_sql(5, row.get::<_, String>(5)?)?,
        last_updated: datetime_from_sql(6, row.get::<_, String>(6)?)?,
        source_message_id: row.get(7)?,
        thread_id: row.get(8)?,
    })
}

const RECORD_COLUMNS: &str = "id, company, job_title, location, status, applied_date, \
                              last_updated, source_message_id, thread_id";

fn status_from_sql(idx: usize, value: String) -> rusqlite::Result<Status> {
    value.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn datetime_from_sql(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Returns all stored application records in insertion order.
pub fn list_all(conn: &Connection) -> Result<Vec<ApplicationRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM applications ORDER BY id"
    ))?;
    let records = stmt
        .query_map([], map_record)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Inserts a new record and returns its id.
pub fn insert(conn: &Connection, record: &ApplicationRecord) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO applications
             (company, job_title, location, status, applied_date, last_updated,
              source_message_id, thread_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            record.company,
            record.job_title,
            record.location,
            record.status.as_str(),
            record.applied_date.to_rfc3339(),
            record.last_updated.to_rfc3339(),
            record.source_message_id,
            record.thread_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Updates the mutable fields of a stored record.
pub fn update(conn: &Connection, id: i64, record: &ApplicationRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE applications
         SET company = ?1, job_title = ?2, location = ?3, status = ?4,
             last_updated = ?5, thread_id = ?6
         WHERE id = ?7",
        params![
            record.company,
            record.job_title,
            record.location,
            record.status.as_str(),
            record.last_updated.to_rfc3339(),
            record.thread_id,
            id,
        ],
    )?;
    Ok(())
}

/// Looks up the live record for a thread.
pub fn find_by_thread_id(
    conn: &Connection,
    thread_id: &str,
) -> Result<Option<ApplicationRecord>, DatabaseError> {
    let record = conn
        .query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM applications WHERE thread_id = ?1 LIMIT 1"),
            params![thread_id],
            map_record,
        )
        .optional()?;
    Ok(record)
}

/// Looks up the live record for a (company, job title) key, case-insensitive
/// and whitespace-trimmed.
pub fn find_by_company_title(
    conn: &Connection,
    company: &str,
    job_title: &str,
) -> Result<Option<ApplicationRecord>, DatabaseError> {
    let record = conn
        .query_row(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM applications
                 WHERE LOWER(TRIM(company)) = LOWER(TRIM(?1))
                   AND LOWER(TRIM(job_title)) = LOWER(TRIM(?2))
                 LIMIT 1"
            ),
            params![company, job_title],
            map_record,
        )
        .optional()?;
    Ok(record)
}

/// Deletes the given records in one batch. Returns the number deleted.
/// Status changes cascade with their parent record.
pub fn delete_batch(conn: &Connection, ids: &[i64]) -> Result<usize, DatabaseError> {
    if ids.is_empty() {
        return Ok(0);
    }

    let placeholders: Vec<String> = (0..ids.len()).map(|i| format!("?{}", i + 1)).collect();
    let sql = format!(
        "DELETE FROM applications WHERE id IN ({})",
        placeholders.join(", ")
    );

    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();
    let deleted = conn.execute(&sql, params_ref.as_slice())?;
    Ok(deleted)
}

/// Appends a status transition to the log.
pub fn insert_status_change(
    conn: &Connection,
    change: &StatusChange,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO status_changes
             (application_id, old_status, new_status, changed_at, source)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            change.application_id,
            change.old_status.map(|s| s.as_str()),
            change.new_status.as_str(),
            change.changed_at.to_rfc3339(),
            change.source.as_str(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Returns the transition log for one application, oldest first.
pub fn status_changes_for(
    conn: &Connection,
    application_id: i64,
) -> Result<Vec<StatusChange>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, application_id, old_status, new_status, changed_at, source
         FROM status_changes WHERE application_id = ?1 ORDER BY id",
    )?;
    let changes = stmt
        .query_map(params![application_id], |row| {
            let old_status = match row.get::<_, Option<String>>(2)? {
                Some(s) => Some(status_from_sql(2, s)?),
                None => None,
            };
            let source: String = row.get(5)?;
            Ok(StatusChange {
                id: Some(row.get(0)?),
                application_id: row.get(1)?,
                old_status,
                new_status: status_from_sql(3, row.get::<_, String>(3)?)?,
                changed_at: datetime_from_sql(4, row.get::<_, String>(4)?)?,
                source: source.parse::<StatusSource>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        5,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(changes)
}

/// Counts all stored applications.
pub fn count(conn: &Connection) -> Result<u64, DatabaseError> {
    let count: u64 = conn.query_row("SELECT COUNT(*) FROM applications", [], |r| r.get(0))?;
    Ok(count)
}

/// Counts stored applications per status, most common first.
pub fn count_by_status(conn: &Connection) -> Result<Vec<(String, u64)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT status, COUNT(*) FROM applications GROUP BY status ORDER BY COUNT(*) DESC",
    )?;
    let counts = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(counts)
}

/// Counts status-change log entries.
pub fn count_status_changes(conn: &Connection) -> Result<u64, DatabaseError> {
    let count: u64 = conn.query_row("SELECT COUNT(*) FROM status_changes", [], |r| r.get(0))?;
    Ok(count)
}
