//! Inbox synchronization pipeline.
//!
//! A run lists inbox messages, skips those already in the processed ledger,
//! classifies the rest, and folds the results into the application store.
//! Progress is checkpointed periodically so an interrupted run resumes
//! where it left off.

pub mod checkpoint;
pub mod context;
pub mod error;
pub mod runner;

pub use context::{PendingChange, RunContext};
pub use error::SyncError;
pub use runner::{SyncOptions, SyncReport, SyncRunner};
