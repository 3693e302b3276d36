//! Duplicate sweep over already-stored applications.
//!
//! Legacy imports and interrupted runs can leave several rows for the same
//! (company, job title) pair. The sweep deletes the redundant ones:
//!
//! 1. When a group contains a Declined record, its Applied records are
//!    superseded and removed.
//! 2. When several records in a group share the same status, the most
//!    complete one is kept (fewest placeholder fields, first stored wins a
//!    tie) and the rest are removed.

use std::collections::HashMap;

use crate::db::{application_repo, Database, DatabaseError};
use crate::model::ApplicationRecord;
use crate::status::Status;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub examined: usize,
    pub deleted: usize,
}

/// Computes the ids to delete. Pure over the given snapshot, so running it
/// again on the surviving records yields an empty plan.
pub fn plan_cleanup(records: &[ApplicationRecord]) -> Vec<i64> {
    let mut groups: HashMap<(String, String), Vec<&ApplicationRecord>> = HashMap::new();
    for record in records {
        if record.id.is_none() {
            continue;
        }
        groups
            .entry((record.company.clone(), record.job_title.clone()))
            .or_default()
            .push(record);
    }

    let mut to_delete = Vec::new();
    for group in groups.values() {
        if group.len() < 2 {
            continue;
        }

        let has_declined = group.iter().any(|r| r.status == Status::Declined);
        let mut survivors: Vec<&ApplicationRecord> = Vec::new();
        for &record in group.iter() {
            if has_declined && record.status == Status::Applied {
                to_delete.push(record.id.unwrap_or_default());
            } else {
                survivors.push(record);
            }
        }

        // Within each status, keep the most complete record.
        let mut best_by_status: HashMap<Status, &ApplicationRecord> = HashMap::new();
        for record in survivors {
            match best_by_status.get(&record.status) {
                Some(best) if record.unknown_field_count() >= best.unknown_field_count() => {
                    to_delete.push(record.id.unwrap_or_default());
                }
                Some(best) => {
                    to_delete.push(best.id.unwrap_or_default());
                    best_by_status.insert(record.status, record);
                }
                None => {
                    best_by_status.insert(record.status, record);
                }
            }
        }
    }

    to_delete.sort_unstable();
    to_delete.dedup();
    to_delete
}

/// Runs the sweep against the store. Plan and deletion happen inside one
/// transaction so a crash leaves either all duplicates or none.
pub fn run_cleanup(db: &Database) -> Result<CleanupReport, DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;

        let records = application_repo::list_all(&tx)?;
        let plan = plan_cleanup(&records);
        let deleted = application_repo::delete_batch(&tx, &plan)?;

        tx.commit()?;

        if deleted > 0 {
            log::info!("cleanup removed {deleted} duplicate application(s)");
        }
        Ok(CleanupReport {
            examined: records.len(),
            deleted,
        })
    })
}
