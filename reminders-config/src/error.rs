//! Configuration errors.

use reminders_core::ReminderError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, reading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration key not found: {0}")]
    KeyNotFound(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load .env file: {0}")]
    Dotenv(String),

    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to parse {format} configuration: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    #[error("Option '{key}' has unexpected shape: {message}")]
    Shape { key: String, message: String },

    #[error("Invalid value for '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
        ConfigError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

impl From<ConfigError> for ReminderError {
    fn from(err: ConfigError) -> Self {
        ReminderError::Settings(err.to_string())
    }
}
