//! Shared test utilities for jobtrail integration tests.
//!
//! Provides in-memory fakes for both collaborators: `FakeInbox` in place of
//! the Gmail client and `ScriptedClassifier` in place of the OpenAI client.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use jobtrail::classify::{Classifier, ClassifyError, RetryPolicy};
use jobtrail::email::{EmailContent, EmailProvider, FetchError};

/// A retry policy with millisecond delays so failure tests finish quickly.
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(
        max_attempts,
        Duration::from_millis(1),
        Duration::from_millis(5),
    )
}

pub fn ts(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).unwrap()
}

#[derive(Debug, Clone)]
pub struct FakeMessage {
    pub id: String,
    pub snippet: String,
    pub body: String,
    pub thread_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl FakeMessage {
    pub fn new(id: &str, snippet: &str, body: &str) -> Self {
        Self {
            id: id.to_string(),
            snippet: snippet.to_string(),
            body: body.to_string(),
            thread_id: None,
            timestamp: Some(ts(9)),
        }
    }

    pub fn in_thread(mut self, thread_id: &str) -> Self {
        self.thread_id = Some(thread_id.to_string());
        self
    }
}

/// In-memory email provider. Messages are served in insertion order.
#[derive(Default)]
pub struct FakeInbox {
    messages: Vec<FakeMessage>,
    fail_listing: bool,
    failing_previews: HashSet<String>,
    previews: AtomicUsize,
    cancel_after: Mutex<Option<(usize, Arc<AtomicBool>)>>,
}

impl FakeInbox {
    pub fn new(messages: Vec<FakeMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    /// Every preview of this message fails with a connection error.
    pub fn with_failing_preview(mut self, message_id: &str) -> Self {
        self.failing_previews.insert(message_id.to_string());
        self
    }

    /// Raises the cancel flag once `count` previews have been served,
    /// simulating an interrupt arriving mid-run.
    pub fn set_cancel_after(&self, count: usize, flag: Arc<AtomicBool>) {
        *self.cancel_after.lock().unwrap() = Some((count, flag));
    }

    fn find(&self, message_id: &str) -> Result<&FakeMessage, FetchError> {
        self.messages
            .iter()
            .find(|m| m.id == message_id)
            .ok_or_else(|| FetchError::NotFound(message_id.to_string()))
    }
}

#[async_trait]
impl EmailProvider for FakeInbox {
    async fn list_messages(
        &self,
        _lookback_hours: Option<u32>,
        max_results: usize,
    ) -> Result<Vec<String>, FetchError> {
        if self.fail_listing {
            return Err(FetchError::Provider("listing unavailable".to_string()));
        }
        Ok(self
            .messages
            .iter()
            .take(max_results)
            .map(|m| m.id.clone())
            .collect())
    }

    async fn preview(&self, message_id: &str) -> Result<String, FetchError> {
        let served = self.previews.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((count, flag)) = self.cancel_after.lock().unwrap().as_ref() {
            if served >= *count {
                flag.store(true, Ordering::SeqCst);
            }
        }
        if self.failing_previews.contains(message_id) {
            return Err(FetchError::Connection("socket reset".to_string()));
        }
        Ok(self.find(message_id)?.snippet.clone())
    }

    async fn fetch(&self, message_id: &str) -> Result<EmailContent, FetchError> {
        let message = self.find(message_id)?;
        Ok(EmailContent {
            text: message.body.clone(),
            timestamp: message.timestamp,
            thread_id: message.thread_id.clone(),
        })
    }
}

/// Classifier whose answers are scripted per message body. Snippets listed
/// as irrelevant fail the pre-filter; bodies without a scripted reply get
/// the refusal sentinel.
#[derive(Default)]
pub struct ScriptedClassifier {
    replies: HashMap<String, String>,
    irrelevant_snippets: HashSet<String>,
    failing_bodies: HashSet<String>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, body: &str, reply: &str) -> Self {
        self.replies.insert(body.to_string(), reply.to_string());
        self
    }

    pub fn irrelevant(mut self, snippet: &str) -> Self {
        self.irrelevant_snippets.insert(snippet.to_string());
        self
    }

    /// Every classification of this body fails with a rate-limit error.
    pub fn failing(mut self, body: &str) -> Self {
        self.failing_bodies.insert(body.to_string());
        self
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn is_job_related(&self, snippet: &str) -> Result<bool, ClassifyError> {
        Ok(!self.irrelevant_snippets.contains(snippet))
    }

    async fn classify(&self, content: &str) -> Result<String, ClassifyError> {
        if self.failing_bodies.contains(content) {
            return Err(ClassifyError::RateLimited("try again later".to_string()));
        }
        Ok(self
            .replies
            .get(content)
            .cloned()
            .unwrap_or_else(|| "Not Job Application".to_string()))
    }
}
