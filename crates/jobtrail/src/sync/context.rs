//! In-memory state for one sync run.
//!
//! All work in a run happens against this snapshot; nothing touches the
//! database between checkpoints. Records created during the run have no id
//! until the checkpoint that persists them assigns one.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};

use crate::db::{application_repo, processed_repo, Database, DatabaseError};
use crate::model::{ApplicationRecord, ProcessedMessage, StatusSource};
use crate::status::Status;

/// A status transition observed during the run, to be written at the next
/// checkpoint. References the record by snapshot index because new records
/// have no id yet.
#[derive(Debug, Clone)]
pub struct PendingChange {
    pub record_index: usize,
    pub old_status: Option<Status>,
    pub new_status: Status,
    pub changed_at: DateTime<Utc>,
    pub source: StatusSource,
}

pub struct RunContext {
    pub records: Vec<ApplicationRecord>,
    pub(super) dirty: BTreeSet<usize>,
    pub(super) pending_changes: Vec<PendingChange>,
    pub(super) pending_markers: Vec<ProcessedMessage>,
    processed_ids: HashSet<String>,
}

impl RunContext {
    /// Loads the full store snapshot: all application records plus the
    /// processed-message ledger.
    pub fn load(db: &Database) -> Result<Self, DatabaseError> {
        let (records, processed_ids) = db.with_conn(|conn| {
            Ok((
                application_repo::list_all(conn)?,
                processed_repo::load_all(conn)?,
            ))
        })?;
        log::debug!(
            "loaded run context: {} record(s), {} processed message(s)",
            records.len(),
            processed_ids.len()
        );
        Ok(RunContext {
            records,
            dirty: BTreeSet::new(),
            pending_changes: Vec::new(),
            pending_markers: Vec::new(),
            processed_ids,
        })
    }

    pub fn is_processed(&self, message_id: &str) -> bool {
        self.processed_ids.contains(message_id)
    }

    /// Marks a message as handled. Write-once: a second call for the same
    /// id is ignored.
    pub fn mark_processed(&mut self, message_id: &str, was_job_related: bool) {
        if !self.processed_ids.insert(message_id.to_string()) {
            return;
        }
        self.pending_markers.push(ProcessedMessage {
            message_id: message_id.to_string(),
            processed_at: Utc::now(),
            was_job_related,
        });
    }

    /// Adds a new record to the snapshot and returns its index.
    pub fn create_record(&mut self, record: ApplicationRecord) -> usize {
        let index = self.records.len();
        self.records.push(record);
        self.dirty.insert(index);
        index
    }

    /// Flags an existing record as modified so the next checkpoint writes it.
    pub fn touch(&mut self, index: usize) {
        self.dirty.insert(index);
    }

    pub fn record_status_change(&mut self, change: PendingChange) {
        self.pending_changes.push(change);
    }

    /// True when the next checkpoint has anything to write.
    pub fn has_pending(&self) -> bool {
        !self.dirty.is_empty() || !self.pending_changes.is_empty() || !self.pending_markers.is_empty()
    }

    /// Number of markers waiting for the next checkpoint.
    pub fn pending_marker_count(&self) -> usize {
        self.pending_markers.len()
    }
}
