//! Mail error types.

use reminders_core::ReminderError;
use thiserror::Error;

/// Result type for mail operations.
pub type Result<T> = std::result::Result<T, MailError>;

/// Mail errors.
#[derive(Debug, Error)]
pub enum MailError {
    /// SMTP protocol or connection error.
    #[error("SMTP error: {0}")]
    Smtp(String),

    /// The server refused the message permanently.
    #[error("Message rejected: {0}")]
    Rejected(String),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Missing required field.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error.
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limited.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Timeout error.
    #[error("Operation timed out")]
    Timeout,
}

impl MailError {
    /// Whether another attempt might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Smtp(_) | Self::Network(_) | Self::Timeout | Self::RateLimited(_)
        )
    }

    /// Server-requested backoff, when rate limited.
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        if let Self::RateLimited(secs) = self {
            Some(std::time::Duration::from_secs(*secs))
        } else {
            None
        }
    }
}

impl From<lettre::transport::smtp::Error> for MailError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        if err.is_permanent() {
            Self::Rejected(err.to_string())
        } else if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Smtp(err.to_string())
        }
    }
}

impl From<lettre::address::AddressError> for MailError {
    fn from(err: lettre::address::AddressError) -> Self {
        Self::InvalidAddress(err.to_string())
    }
}

impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<MailError> for ReminderError {
    fn from(err: MailError) -> Self {
        ReminderError::Delivery(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(MailError::Timeout.is_retryable());
        assert!(MailError::Network("reset".to_string()).is_retryable());
        assert!(!MailError::Rejected("550 no such user".to_string()).is_retryable());
        assert!(!MailError::InvalidAddress("x".to_string()).is_retryable());
        assert_eq!(
            MailError::RateLimited(30).retry_after(),
            Some(std::time::Duration::from_secs(30))
        );
    }

    #[test]
    fn test_delivery_errors_are_not_fatal_for_runs() {
        let err: ReminderError = MailError::Timeout.into();
        assert!(matches!(err, ReminderError::Delivery(_)));
        assert!(!err.is_fatal());
    }
}
