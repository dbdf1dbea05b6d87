//! Error types for Warden configuration

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Startup errors. Any of these is fatal: the process must not run without
/// a complete configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),
}

impl ConfigError {
    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "ConfigUnreadable",
            ConfigError::Parse(_) => "ConfigMalformed",
            ConfigError::Missing(_) => "ConfigMissing",
            ConfigError::Invalid { .. } => "ConfigInvalid",
            ConfigError::InvalidKey(_) => "InvalidKey",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ConfigError::Missing("vault.key").code(), "ConfigMissing");
        assert_eq!(
            ConfigError::invalid("directory.domain", "empty").code(),
            "ConfigInvalid"
        );
    }

    #[test]
    fn test_error_messages() {
        let err = ConfigError::invalid("directory.timeout_seconds", "must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid setting directory.timeout_seconds: must be positive"
        );
        assert_eq!(
            ConfigError::Missing("vault.key").to_string(),
            "Missing required setting: vault.key"
        );
    }
}
