//! Checkpoint persistence.
//!
//! Everything a run has accumulated since the last checkpoint — new and
//! modified records, status transitions, processed-message markers — is
//! written in one transaction. On a crash either the whole checkpoint is
//! visible or none of it, so a message is never marked processed without
//! its record and vice versa.

use crate::db::{application_repo, processed_repo, Database, DatabaseError};
use crate::model::StatusChange;

use super::context::RunContext;

/// Persists all pending state in one transaction and clears the pending
/// buffers. A no-op when nothing is pending.
pub fn persist(db: &Database, ctx: &mut RunContext) -> Result<(), DatabaseError> {
    if !ctx.has_pending() {
        return Ok(());
    }

    let dirty: Vec<usize> = ctx.dirty.iter().copied().collect();

    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;

        for &index in &dirty {
            let record = &mut ctx.records[index];
            match record.id {
                Some(id) => application_repo::update(&tx, id, record)?,
                None => record.id = Some(application_repo::insert(&tx, record)?),
            }
        }

        for change in &ctx.pending_changes {
            let application_id = ctx.records[change.record_index]
                .id
                .expect("record persisted earlier in this checkpoint");
            application_repo::insert_status_change(
                &tx,
                &StatusChange {
                    id: None,
                    application_id,
                    old_status: change.old_status,
                    new_status: change.new_status,
                    changed_at: change.changed_at,
                    source: change.source,
                },
            )?;
        }

        for marker in &ctx.pending_markers {
            processed_repo::insert(&tx, marker)?;
        }

        tx.commit()?;
        Ok(())
    })?;

    log::debug!(
        "checkpoint: {} record(s), {} change(s), {} marker(s)",
        dirty.len(),
        ctx.pending_changes.len(),
        ctx.pending_markers.len()
    );

    ctx.dirty.clear();
    ctx.pending_changes.clear();
    ctx.pending_markers.clear();
    Ok(())
}
