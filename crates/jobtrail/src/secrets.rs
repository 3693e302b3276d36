//! Secret resolution from the environment.
//!
//! Credentials never appear in the config file; the config names the
//! environment variable and the value is read at startup into a
//! [`SecretString`] so it stays out of debug output and logs.

use secrecy::SecretString;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

/// Reads the named environment variable into a secret.
pub fn env_secret(name: &str) -> Result<SecretString, SecretError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(SecretString::from(value)),
        Ok(_) | Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
            name: name.to_string(),
        }),
        Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
            name: name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_env_secret_present() {
        std::env::set_var("JOBTRAIL_TEST_SECRET", "token-123");
        let secret = env_secret("JOBTRAIL_TEST_SECRET").unwrap();
        assert_eq!(secret.expose_secret(), "token-123");
        std::env::remove_var("JOBTRAIL_TEST_SECRET");
    }

    #[test]
    fn test_env_secret_missing() {
        let err = env_secret("JOBTRAIL_TEST_SECRET_MISSING").unwrap_err();
        assert!(matches!(err, SecretError::EnvVarNotSet { .. }));
    }

    #[test]
    fn test_env_secret_empty_counts_as_missing() {
        std::env::set_var("JOBTRAIL_TEST_SECRET_EMPTY", "");
        let err = env_secret("JOBTRAIL_TEST_SECRET_EMPTY").unwrap_err();
        assert!(matches!(err, SecretError::EnvVarNotSet { .. }));
        std::env::remove_var("JOBTRAIL_TEST_SECRET_EMPTY");
    }
}
