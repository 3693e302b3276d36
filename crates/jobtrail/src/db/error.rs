//! Errors raised by the application store.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Underlying SQLite failure, including row-mapping conversions.
    #[error("store query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The directory holding the store file could not be prepared.
    #[error("cannot prepare store directory '{path}': {source}")]
    StoreDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A schema migration did not apply cleanly. The store is left at the
    /// last good version.
    #[error("schema migration v{version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// A thread panicked while holding the connection.
    #[error("store connection lock poisoned")]
    LockPoisoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_error_names_version() {
        let err = DatabaseError::Migration {
            version: 3,
            reason: "table exists".to_string(),
        };
        assert_eq!(err.to_string(), "schema migration v3 failed: table exists");
    }

    #[test]
    fn test_store_dir_error_names_path() {
        let err = DatabaseError::StoreDir {
            path: PathBuf::from("/nope/data"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/nope/data"));
    }
}
