//! Correlation of a freshly classified email with known applications.
//!
//! Matching runs over the in-memory run snapshot rather than the database,
//! so records created earlier in the same run (and not yet checkpointed)
//! participate too.

use crate::model::{ApplicationRecord, CandidateRecord};

/// How a candidate was matched to an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKey {
    /// Same email thread as the known record. Chosen even when the extracted
    /// company or title disagrees with the stored fields.
    Thread,
    /// Case-insensitive, whitespace-trimmed (company, job title) equality.
    CompanyTitle,
}

/// Outcome of correlating one candidate against the known records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    /// No existing record matches; a new application should be created.
    Create,
    /// The candidate refers to the record at `index`.
    Update { index: usize, matched_by: MatchKey },
}

fn key_eq(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Correlates a candidate with the known records. Thread identity wins over
/// the (company, job title) key when both would match different records.
pub fn decide(records: &[ApplicationRecord], candidate: &CandidateRecord) -> MergeDecision {
    if let Some(thread_id) = candidate.thread_id.as_deref() {
        if let Some(index) = records
            .iter()
            .position(|r| r.thread_id.as_deref() == Some(thread_id))
        {
            return MergeDecision::Update {
                index,
                matched_by: MatchKey::Thread,
            };
        }
    }

    if let Some(index) = records.iter().position(|r| {
        key_eq(&r.company, &candidate.company) && key_eq(&r.job_title, &candidate.job_title)
    }) {
        return MergeDecision::Update {
            index,
            matched_by: MatchKey::CompanyTitle,
        };
    }

    MergeDecision::Create
}
