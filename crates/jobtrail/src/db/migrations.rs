//! Database migration system.
//!
//! Tracks applied migrations in a `_migrations` table and applies
//! pending ones in order.

use rusqlite::Connection;

use super::error::DatabaseError;

/// A single migration definition.
struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// All migrations in order. Each is applied at most once.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_applications_table",
        sql: "CREATE TABLE applications (
                  id INTEGER PRIMARY KEY AUTOINCREMENT,
                  company TEXT NOT NULL,
                  job_title TEXT NOT NULL,
                  location TEXT NOT NULL DEFAULT 'Unknown',
                  status TEXT NOT NULL DEFAULT 'Applied',
                  applied_date TEXT NOT NULL,
                  last_updated TEXT NOT NULL,
                  source_message_id TEXT,
                  thread_id TEXT
              );
              CREATE INDEX idx_applications_thread_id ON applications(thread_id);
              CREATE INDEX idx_applications_company_title ON applications(company, job_title);",
    },
    Migration {
        version: 2,
        description: "create_status_changes_table",
        sql: "CREATE TABLE status_changes (
                  id INTEGER PRIMARY KEY AUTOINCREMENT,
                  application_id INTEGER NOT NULL
                      REFERENCES applications(id) ON DELETE CASCADE,
                  old_status TEXT,
                  new_status TEXT NOT NULL,
                  changed_at TEXT NOT NULL,
                  source TEXT NOT NULL DEFAULT 'manual'
              );
              CREATE INDEX idx_status_changes_application
                  ON status_changes(application_id);",
    },
    Migration {
        version: 3,
        description: "create_processed_messages_table",
        sql: "CREATE TABLE processed_messages (
                  message_id TEXT PRIMARY KEY,
                  processed_at TEXT NOT NULL,
                  was_job_related INTEGER NOT NULL DEFAULT 0
              );",
    },
    Migration {
        version: 4,
        description: "create_run_locks_table",
        sql: "CREATE TABLE run_locks (
                  name TEXT PRIMARY KEY,
                  owner TEXT NOT NULL,
                  acquired_at TEXT NOT NULL
              );",
    },
];

/// Runs all pending migrations on the given connection.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    // Create the migrations tracking table.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        log::info!(
            "Running migration v{}: {}",
            migration.version,
            migration.description
        );

        conn.execute_batch(migration.sql)
            .map_err(|e| DatabaseError::Migration {
                version: migration.version,
                reason: e.to_string(),
            })?;

        conn.execute(
            "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
            rusqlite::params![migration.version, migration.description],
        )?;
    }

    Ok(())
}
