pub mod classify;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod merge;
pub mod model;
pub mod secrets;
pub mod status;
pub mod sync;

pub use classify::{Classifier, ClassifyError, OpenAiClassifier, RetryPolicy};
pub use config::{load_config, Config};
pub use db::{Database, DatabaseError};
pub use email::{EmailProvider, FetchError, GmailClient};
pub use error::{ConfigError, JobtrailError, Result};
pub use merge::{run_cleanup, CleanupReport};
pub use model::{ApplicationRecord, CandidateRecord, ProcessedMessage, StatusChange};
pub use secrets::{env_secret, SecretError};
pub use status::Status;
pub use sync::{SyncError, SyncOptions, SyncReport, SyncRunner};
