//! Advisory single-writer lock, stored in the database so concurrent
//! invocations against the same store exclude each other.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{Database, DatabaseError};

const LOCK_NAME: &str = "sync";

/// Locks older than this are treated as leftovers from a crashed run and
/// reclaimed.
const STALE_AFTER_SECS: i64 = 3600;

/// Held for the duration of a sync run. Released explicitly via
/// [`RunLock::release`], or best-effort on drop.
pub struct RunLock {
    db: Database,
    owner: String,
    released: bool,
}

impl RunLock {
    pub fn release(mut self) -> Result<(), DatabaseError> {
        self.released = true;
        release_inner(&self.db, &self.owner)
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = release_inner(&self.db, &self.owner) {
                log::warn!("failed to release run lock on drop: {e}");
            }
        }
    }
}

fn release_inner(db: &Database, owner: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "DELETE FROM run_locks WHERE name = ?1 AND owner = ?2",
            params![LOCK_NAME, owner],
        )?;
        Ok(())
    })
}

/// Attempts to take the sync lock. Returns `None` when another live run
/// holds it. A lock acquired more than [`STALE_AFTER_SECS`] ago is
/// presumed abandoned and reclaimed.
pub fn acquire(db: &Database, owner: &str) -> Result<Option<RunLock>, DatabaseError> {
    let now = Utc::now();
    let acquired = db.with_conn(|conn| {
        let existing = current_holder(conn)?;
        if let Some((holder, acquired_at)) = existing {
            let age = now
                .signed_duration_since(acquired_at)
                .num_seconds();
            if age < STALE_AFTER_SECS {
                log::info!("sync lock held by {holder}, acquired {age}s ago");
                return Ok(false);
            }
            log::warn!("reclaiming stale sync lock from {holder} ({age}s old)");
            conn.execute("DELETE FROM run_locks WHERE name = ?1", params![LOCK_NAME])?;
        }
        conn.execute(
            "INSERT INTO run_locks (name, owner, acquired_at) VALUES (?1, ?2, ?3)",
            params![LOCK_NAME, owner, now.to_rfc3339()],
        )?;
        Ok(true)
    })?;

    if acquired {
        Ok(Some(RunLock {
            db: db.clone(),
            owner: owner.to_string(),
            released: false,
        }))
    } else {
        Ok(None)
    }
}

fn current_holder(
    conn: &Connection,
) -> Result<Option<(String, chrono::DateTime<Utc>)>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT owner, acquired_at FROM run_locks WHERE name = ?1",
            params![LOCK_NAME],
            |r| {
                let owner: String = r.get(0)?;
                let raw: String = r.get(1)?;
                let at = chrono::DateTime::parse_from_rfc3339(&raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            1,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?;
                Ok((owner, at))
            },
        )
        .optional()?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_release() {
        let db = Database::open_in_memory().unwrap();
        let lock = acquire(&db, "run-1").unwrap().expect("lock free");
        assert!(acquire(&db, "run-2").unwrap().is_none());
        lock.release().unwrap();
        assert!(acquire(&db, "run-2").unwrap().is_some());
    }

    #[test]
    fn test_drop_releases() {
        let db = Database::open_in_memory().unwrap();
        {
            let _lock = acquire(&db, "run-1").unwrap().expect("lock free");
        }
        assert!(acquire(&db, "run-2").unwrap().is_some());
    }

    #[test]
    fn test_stale_lock_is_reclaimed() {
        let db = Database::open_in_memory().unwrap();
        let stale = (Utc::now() - chrono::Duration::seconds(STALE_AFTER_SECS + 60)).to_rfc3339();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO run_locks (name, owner, acquired_at) VALUES (?1, 'dead', ?2)",
                params![LOCK_NAME, stale],
            )?;
            Ok(())
        })
        .unwrap();

        let lock = acquire(&db, "run-2").unwrap();
        assert!(lock.is_some());
    }
}
