//! Email-provider collaborator interface and the Gmail implementation.

pub mod error;
pub mod gmail;

pub use error::FetchError;
pub use gmail::GmailClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Full content of one fetched message.
#[derive(Debug, Clone)]
pub struct EmailContent {
    /// Assembled message text (headers of interest plus body).
    pub text: String,
    /// When the message was received, if the provider reports it.
    pub timestamp: Option<DateTime<Utc>>,
    /// Provider thread id correlating replies about the same application.
    pub thread_id: Option<String>,
}

/// The email-provider collaborator. Pagination and OAuth are the provider's
/// concern; the pipeline only sees message ids and content.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Lists candidate message ids, optionally bounded by a lookback window
    /// and a result-count limit.
    async fn list_messages(
        &self,
        lookback_hours: Option<u32>,
        max_results: usize,
    ) -> Result<Vec<String>, FetchError>;

    /// Short preview text used by the relevance pre-filter.
    async fn preview(&self, message_id: &str) -> Result<String, FetchError>;

    /// Full content of one message.
    async fn fetch(&self, message_id: &str) -> Result<EmailContent, FetchError>;
}
