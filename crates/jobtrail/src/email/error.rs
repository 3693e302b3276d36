//! Email-provider error types.

use thiserror::Error;

/// Errors from the email-provider collaborator.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Provider unreachable or connection dropped.
    #[error("provider connection failed: {0}")]
    Connection(String),

    /// Credentials were rejected.
    #[error("provider authentication failed: {0}")]
    Auth(String),

    /// The requested message no longer exists.
    #[error("message not found: {0}")]
    NotFound(String),

    /// Provider reported an error for this request.
    #[error("provider error: {0}")]
    Provider(String),

    /// The response could not be interpreted.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl FetchError {
    /// Transient failures worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Connection(_) | FetchError::Provider(_))
    }

    /// Failures that end the whole run even when hit on a single message.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::Auth(_))
    }
}
