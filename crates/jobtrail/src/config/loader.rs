use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.sync.max_messages == 0 {
        return Err(ConfigError::Validation {
            message: "sync.max_messages must be at least 1".to_string(),
        });
    }
    if config.sync.checkpoint_interval == 0 {
        return Err(ConfigError::Validation {
            message: "sync.checkpoint_interval must be at least 1".to_string(),
        });
    }
    if config.sync.retry.max_attempts == 0 {
        return Err(ConfigError::Validation {
            message: "sync.retry.max_attempts must be at least 1".to_string(),
        });
    }
    if config.gmail.access_token_env.is_empty() || config.classifier.api_key_env.is_empty() {
        return Err(ConfigError::Validation {
            message: "credential environment variable names must not be empty".to_string(),
        });
    }

    Ok(())
}
