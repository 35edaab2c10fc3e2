//! Errors surfaced by the host application.

use reminders_audit::AuditBackendError;
use reminders_config::ConfigError;
use reminders_core::ReminderError;
use reminders_cron::CronError;
use reminders_mail::MailError;
use std::path::PathBuf;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Reminder(#[from] ReminderError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error(transparent)]
    Audit(#[from] AuditBackendError),

    #[error(transparent)]
    Cron(#[from] CronError),

    /// A data file could not be read or written.
    #[error("{path}: {message}")]
    Storage { path: PathBuf, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl AppError {
    pub(crate) fn storage(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Storage {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) | AppError::InvalidArgument(_) => 2,
            AppError::Reminder(e) if e.is_fatal() => 3,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::InvalidArgument("x".into()).exit_code(), 2);
        assert_eq!(
            AppError::from(ReminderError::StoreUnavailable("down".into())).exit_code(),
            3
        );
        assert_eq!(
            AppError::from(ReminderError::NoticeNotFound(9)).exit_code(),
            1
        );
    }
}
