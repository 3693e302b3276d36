//! Duplicate detection and record merging.
//!
//! Two concerns live here: deciding at ingestion time whether a classified
//! email belongs to an existing application ([`engine`]), and sweeping
//! already-stored duplicates out of the database ([`cleanup`]).

pub mod cleanup;
pub mod engine;

pub use cleanup::{plan_cleanup, run_cleanup, CleanupReport};
pub use engine::{decide, MatchKey, MergeDecision};
