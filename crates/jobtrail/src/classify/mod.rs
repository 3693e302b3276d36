//! Text-classification collaborator: trait, HTTP client, retry policy, and
//! the tolerant parser for the classifier's free-form output.

pub mod error;
pub mod openai;
pub mod parser;
pub mod retry;

pub use error::ClassifyError;
pub use openai::OpenAiClassifier;
pub use parser::{looks_like_job_application, parse_classification, ClassifiedFields};
pub use retry::RetryPolicy;

use async_trait::async_trait;

/// The classification collaborator. Output is free-form text with no
/// structure guaranteed beyond the `Key: Value` convention; callers must
/// treat it as untrusted and feed it through [`parser`].
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Cheap relevance pre-check over a short preview. Bounds the number of
    /// expensive full-classification calls per run.
    async fn is_job_related(&self, snippet: &str) -> Result<bool, ClassifyError>;

    /// Full extraction call over the complete message text.
    async fn classify(&self, content: &str) -> Result<String, ClassifyError>;
}
