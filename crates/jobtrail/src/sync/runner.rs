//! The sync run: fetch inbox messages, classify them, and fold the results
//! into the application store with periodic checkpoints.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, info_span, warn, Instrument};

use crate::classify::{parser, Classifier, ClassifyError, RetryPolicy};
use crate::db::{lock, Database};
use crate::email::{EmailProvider, FetchError};
use crate::merge::{decide, MergeDecision};
use crate::model::{ApplicationRecord, CandidateRecord, StatusSource, UNKNOWN};
use crate::status::Status;

use super::checkpoint;
use super::context::{PendingChange, RunContext};
use super::error::SyncError;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Restrict the inbox listing to messages newer than this many hours.
    pub lookback_hours: Option<u32>,
    /// Upper bound on messages examined per run.
    pub max_messages: usize,
    /// Checkpoint after this many newly handled messages.
    pub checkpoint_interval: usize,
    pub retry: RetryPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            lookback_hours: None,
            max_messages: 100,
            checkpoint_interval: 10,
            retry: RetryPolicy::default(),
        }
    }
}

/// What one run did, for logging and the CLI summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub fetched: usize,
    pub skipped: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub not_job_related: usize,
    pub failed: usize,
    pub checkpoints: usize,
}

enum MessageOutcome {
    Created,
    Updated,
    Unchanged,
    NotJobRelated,
}

pub struct SyncRunner {
    db: Database,
    provider: Arc<dyn EmailProvider>,
    classifier: Arc<dyn Classifier>,
    options: SyncOptions,
    cancel: Arc<AtomicBool>,
}

impl SyncRunner {
    pub fn new(
        db: Database,
        provider: Arc<dyn EmailProvider>,
        classifier: Arc<dyn Classifier>,
        options: SyncOptions,
    ) -> Self {
        Self {
            db,
            provider,
            classifier,
            options,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked between messages. Setting it (e.g. from a Ctrl-C
    /// handler) makes the run checkpoint its progress and stop.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        self.run_inner().instrument(info_span!("sync_run")).await
    }

    async fn run_inner(&self) -> Result<SyncReport, SyncError> {
        let owner = format!("sync-{}", std::process::id());
        let run_lock = lock::acquire(&self.db, &owner)?.ok_or(SyncError::StoreLocked)?;

        let result = self.run_locked().await;

        if let Err(e) = run_lock.release() {
            warn!("failed to release run lock: {e}");
        }
        result
    }

    async fn run_locked(&self) -> Result<SyncReport, SyncError> {
        let mut ctx = RunContext::load(&self.db)?;
        let mut report = SyncReport::default();

        // A failure to list the inbox aborts the run; there is nothing to
        // work on without it.
        let message_ids = self
            .options
            .retry
            .run("list messages", FetchError::is_retryable, || {
                self.provider
                    .list_messages(self.options.lookback_hours, self.options.max_messages)
            })
            .await?;
        report.fetched = message_ids.len();
        info!("inbox listing returned {} message(s)", message_ids.len());

        for message_id in &message_ids {
            if self.cancel.load(Ordering::SeqCst) {
                info!("cancellation requested, stopping");
                break;
            }
            if ctx.is_processed(message_id) {
                report.skipped += 1;
                continue;
            }

            match self.process_message(&mut ctx, message_id).await {
                Ok(MessageOutcome::Created) => report.created += 1,
                Ok(MessageOutcome::Updated) => report.updated += 1,
                Ok(MessageOutcome::Unchanged) => report.unchanged += 1,
                Ok(MessageOutcome::NotJobRelated) => report.not_job_related += 1,
                Err(e) if e.is_fatal() => {
                    checkpoint::persist(&self.db, &mut ctx)?;
                    return Err(e);
                }
                Err(e) => {
                    warn!("message {message_id} failed, skipping it from now on: {e}");
                    ctx.mark_processed(message_id, false);
                    report.failed += 1;
                }
            }

            if ctx.pending_marker_count() >= self.options.checkpoint_interval {
                checkpoint::persist(&self.db, &mut ctx)?;
                report.checkpoints += 1;
            }
        }

        if ctx.has_pending() {
            checkpoint::persist(&self.db, &mut ctx)?;
            report.checkpoints += 1;
        }

        info!(
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            not_job_related = report.not_job_related,
            skipped = report.skipped,
            failed = report.failed,
            "sync run finished"
        );
        Ok(report)
    }

    async fn process_message(
        &self,
        ctx: &mut RunContext,
        message_id: &str,
    ) -> Result<MessageOutcome, SyncError> {
        let retry = &self.options.retry;

        let snippet = retry
            .run("preview", FetchError::is_retryable, || {
                self.provider.preview(message_id)
            })
            .await?;
        let job_related = retry
            .run("pre-filter", ClassifyError::is_retryable, || {
                self.classifier.is_job_related(&snippet)
            })
            .await?;
        if !job_related {
            ctx.mark_processed(message_id, false);
            return Ok(MessageOutcome::NotJobRelated);
        }

        let content = retry
            .run("fetch", FetchError::is_retryable, || {
                self.provider.fetch(message_id)
            })
            .await?;
        let reply = retry
            .run("classify", ClassifyError::is_retryable, || {
                self.classifier.classify(&content.text)
            })
            .await?;

        if !parser::looks_like_job_application(&reply) {
            ctx.mark_processed(message_id, false);
            return Ok(MessageOutcome::NotJobRelated);
        }
        let fields = parser::parse_classification(&reply);
        if fields.is_empty() {
            ctx.mark_processed(message_id, false);
            return Ok(MessageOutcome::NotJobRelated);
        }

        let candidate = CandidateRecord {
            company: or_unknown(fields.company),
            job_title: or_unknown(fields.job_title),
            location: or_unknown(fields.location),
            status: fields.status.unwrap_or(Status::Applied),
            message_id: message_id.to_string(),
            thread_id: content.thread_id.clone(),
            observed_at: content.timestamp.unwrap_or_else(Utc::now),
        };

        let outcome = apply(ctx, candidate);
        ctx.mark_processed(message_id, true);
        Ok(outcome)
    }
}

fn or_unknown(value: String) -> String {
    if value.trim().is_empty() {
        UNKNOWN.to_string()
    } else {
        value
    }
}

fn is_placeholder(value: &str) -> bool {
    value.trim().is_empty() || value.trim().eq_ignore_ascii_case(UNKNOWN)
}

/// Folds a classified candidate into the run snapshot.
fn apply(ctx: &mut RunContext, candidate: CandidateRecord) -> MessageOutcome {
    match decide(&ctx.records, &candidate) {
        MergeDecision::Create => {
            info!(
                company = %candidate.company,
                job_title = %candidate.job_title,
                status = %candidate.status,
                "new application"
            );
            let status = candidate.status;
            let observed_at = candidate.observed_at;
            let index = ctx.create_record(ApplicationRecord {
                id: None,
                company: candidate.company,
                job_title: candidate.job_title,
                location: candidate.location,
                status,
                applied_date: observed_at,
                last_updated: observed_at,
                source_message_id: Some(candidate.message_id),
                thread_id: candidate.thread_id,
            });
            ctx.record_status_change(PendingChange {
                record_index: index,
                old_status: None,
                new_status: status,
                changed_at: observed_at,
                source: StatusSource::Email,
            });
            MessageOutcome::Created
        }
        MergeDecision::Update { index, .. } => {
            let mut touched = false;
            let mut transition = None;
            {
                let record = &mut ctx.records[index];
                if is_placeholder(&record.location) && !is_placeholder(&candidate.location) {
                    record.location = candidate.location.clone();
                    touched = true;
                }
                if record.thread_id.is_none() && candidate.thread_id.is_some() {
                    record.thread_id = candidate.thread_id.clone();
                    touched = true;
                }
                if record.status != candidate.status {
                    transition = Some(record.status);
                    record.status = candidate.status;
                    touched = true;
                }
                if touched {
                    record.last_updated = candidate.observed_at;
                }
            }

            if let Some(old_status) = transition {
                info!(
                    company = %ctx.records[index].company,
                    from = %old_status,
                    to = %candidate.status,
                    "status change"
                );
                ctx.record_status_change(PendingChange {
                    record_index: index,
                    old_status: Some(old_status),
                    new_status: candidate.status,
                    changed_at: candidate.observed_at,
                    source: StatusSource::Email,
                });
            }

            if touched {
                ctx.touch(index);
                MessageOutcome::Updated
            } else {
                MessageOutcome::Unchanged
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(status: Status, thread_id: Option<&str>) -> CandidateRecord {
        CandidateRecord {
            company: "Acme".to_string(),
            job_title: "Engineer".to_string(),
            location: "Unknown".to_string(),
            status,
            message_id: "m2".to_string(),
            thread_id: thread_id.map(str::to_string),
            observed_at: Utc::now(),
        }
    }

    fn context_with_one_record(db: &Database) -> RunContext {
        let mut ctx = RunContext::load(db).unwrap();
        apply(
            &mut ctx,
            CandidateRecord {
                message_id: "m1".to_string(),
                ..candidate(Status::Applied, Some("t-1"))
            },
        );
        ctx
    }

    #[test]
    fn test_apply_creates_and_logs_initial_status() {
        let db = Database::open_in_memory().unwrap();
        let mut ctx = RunContext::load(&db).unwrap();
        let outcome = apply(&mut ctx, candidate(Status::Applied, Some("t-1")));
        assert!(matches!(outcome, MessageOutcome::Created));
        assert_eq!(ctx.records.len(), 1);
        assert_eq!(ctx.records[0].status, Status::Applied);
    }

    #[test]
    fn test_apply_updates_status_on_thread_match() {
        let db = Database::open_in_memory().unwrap();
        let mut ctx = context_with_one_record(&db);
        let outcome = apply(&mut ctx, candidate(Status::Declined, Some("t-1")));
        assert!(matches!(outcome, MessageOutcome::Updated));
        assert_eq!(ctx.records.len(), 1);
        assert_eq!(ctx.records[0].status, Status::Declined);
    }

    #[test]
    fn test_apply_same_status_is_unchanged() {
        let db = Database::open_in_memory().unwrap();
        let mut ctx = context_with_one_record(&db);
        let outcome = apply(&mut ctx, candidate(Status::Applied, Some("t-1")));
        assert!(matches!(outcome, MessageOutcome::Unchanged));
    }

    #[test]
    fn test_apply_fills_placeholder_location() {
        let db = Database::open_in_memory().unwrap();
        let mut ctx = context_with_one_record(&db);
        let mut better = candidate(Status::Applied, Some("t-1"));
        better.location = "Berlin".to_string();
        let outcome = apply(&mut ctx, better);
        assert!(matches!(outcome, MessageOutcome::Updated));
        assert_eq!(ctx.records[0].location, "Berlin");
    }
}
