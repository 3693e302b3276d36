//! Classification collaborator error types.

use thiserror::Error;

/// Errors from the text-classification collaborator.
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// The service rejected the call due to rate limiting.
    #[error("classifier rate limited: {0}")]
    RateLimited(String),

    /// Connectivity or server-side failure.
    #[error("classifier connection failed: {0}")]
    Connection(String),

    /// Credentials were rejected.
    #[error("classifier authentication failed: {0}")]
    Auth(String),

    /// The service rejected the request as malformed.
    #[error("malformed classifier request: {0}")]
    InvalidRequest(String),

    /// The response did not contain usable text.
    #[error("unexpected classifier response: {0}")]
    UnexpectedResponse(String),
}

impl ClassifyError {
    /// Transient failures worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClassifyError::RateLimited(_) | ClassifyError::Connection(_)
        )
    }

    /// Permanent failures that end the whole run rather than one message.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ClassifyError::Auth(_) | ClassifyError::InvalidRequest(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ClassifyError::RateLimited("429".into()).is_retryable());
        assert!(ClassifyError::Connection("reset".into()).is_retryable());
        assert!(!ClassifyError::Auth("401".into()).is_retryable());
        assert!(!ClassifyError::UnexpectedResponse("empty".into()).is_retryable());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(ClassifyError::Auth("401".into()).is_fatal());
        assert!(ClassifyError::InvalidRequest("400".into()).is_fatal());
        assert!(!ClassifyError::RateLimited("429".into()).is_fatal());
        assert!(!ClassifyError::UnexpectedResponse("empty".into()).is_fatal());
    }
}
