use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::RetryPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    /// Overrides the default store location (`~/.jobtrail/data/jobtrail.db`).
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub gmail: GmailSettings,
    #[serde(default)]
    pub classifier: ClassifierSettings,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            database_path: None,
            sync: SyncSettings::default(),
            gmail: GmailSettings::default(),
            classifier: ClassifierSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default)]
    pub lookback_hours: Option<u32>,
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,
    #[serde(default)]
    pub retry: RetrySettings,
}

fn default_max_messages() -> usize {
    100
}

fn default_checkpoint_interval() -> usize {
    10
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            lookback_hours: None,
            max_messages: default_max_messages(),
            checkpoint_interval: default_checkpoint_interval(),
            retry: RetrySettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_secs() -> u64 {
    2
}

fn default_max_delay_secs() -> u64 {
    10
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_secs(self.base_delay_secs),
            Duration::from_secs(self.max_delay_secs),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailSettings {
    /// Environment variable holding the Gmail API access token.
    #[serde(default = "default_gmail_token_env")]
    pub access_token_env: String,
}

fn default_gmail_token_env() -> String {
    "GMAIL_ACCESS_TOKEN".to_string()
}

impl Default for GmailSettings {
    fn default() -> Self {
        Self {
            access_token_env: default_gmail_token_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierSettings {
    /// Environment variable holding the OpenAI API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: None,
            base_url: None,
        }
    }
}
