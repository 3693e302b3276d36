//! Domain types shared across the pipeline.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::status::Status;

/// Placeholder value the coordinator writes for fields the classifier could
/// not extract.
pub const UNKNOWN: &str = "Unknown";

/// One observed or persisted job application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationRecord {
    /// Database id. `None` until the record has been checkpointed.
    pub id: Option<i64>,
    pub company: String,
    pub job_title: String,
    pub location: String,
    pub status: Status,
    pub applied_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// Message that created this record.
    pub source_message_id: Option<String>,
    /// Provider thread id correlating messages about the same application.
    pub thread_id: Option<String>,
}

impl ApplicationRecord {
    /// Number of empty or placeholder fields, counting missing correlation
    /// ids. The cleanup pass keeps the record with the lowest count when
    /// deduplicating.
    pub fn unknown_field_count(&self) -> usize {
        let text_fields = [&self.company, &self.job_title, &self.location];
        let placeholder_texts = text_fields
            .iter()
            .filter(|v| v.is_empty() || v.as_str() == UNKNOWN)
            .count();
        let missing_ids = [&self.source_message_id, &self.thread_id]
            .iter()
            .filter(|v| v.as_deref().map_or(true, str::is_empty))
            .count();
        placeholder_texts + missing_ids
    }
}

/// A candidate produced by classifying one message, before correlation
/// against the stored record set.
#[derive(Debug, Clone)]
pub struct CandidateRecord {
    pub company: String,
    pub job_title: String,
    pub location: String,
    pub status: Status,
    pub message_id: String,
    pub thread_id: Option<String>,
    /// Timestamp of the originating message.
    pub observed_at: DateTime<Utc>,
}

/// Where a status transition was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSource {
    Manual,
    Email,
    Import,
}

impl StatusSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusSource::Manual => "manual",
            StatusSource::Email => "email",
            StatusSource::Import => "import",
        }
    }
}

impl fmt::Display for StatusSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for strings that are not a known status source.
#[derive(Debug, Error)]
#[error("unknown status source '{0}'")]
pub struct ParseSourceError(pub String);

impl FromStr for StatusSource {
    type Err = ParseSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(StatusSource::Manual),
            "email" => Ok(StatusSource::Email),
            "import" => Ok(StatusSource::Import),
            other => Err(ParseSourceError(other.to_string())),
        }
    }
}

/// Append-only log entry recording one observed status transition.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub id: Option<i64>,
    pub application_id: i64,
    /// `None` for the initial transition when the record is created.
    pub old_status: Option<Status>,
    pub new_status: Status,
    pub changed_at: DateTime<Utc>,
    pub source: StatusSource,
}

/// Idempotency-ledger entry: once a message id appears here, it is never
/// re-fetched or re-classified, regardless of outcome.
#[derive(Debug, Clone)]
pub struct ProcessedMessage {
    pub message_id: String,
    pub processed_at: DateTime<Utc>,
    pub was_job_related: bool,
}
