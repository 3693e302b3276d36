use thiserror::Error;

use crate::classify::ClassifyError;
use crate::db::DatabaseError;
use crate::email::FetchError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("email fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("classification failed: {0}")]
    Classify(#[from] ClassifyError),

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("another sync run holds the store lock")]
    StoreLocked,
}

impl SyncError {
    /// Fatal errors abort the whole run; everything else is handled
    /// per message.
    pub fn is_fatal(&self) -> bool {
        match self {
            SyncError::Fetch(e) => e.is_fatal(),
            SyncError::Classify(e) => e.is_fatal(),
            SyncError::Database(_) => true,
            SyncError::StoreLocked => true,
        }
    }
}
