//! Reminder error types.

use crate::notice::NoticeKey;
use crate::subscriber::SubscriberId;
use thiserror::Error;

/// Result type for reminder operations.
pub type Result<T> = std::result::Result<T, ReminderError>;

/// Reminder errors.
#[derive(Debug, Error)]
pub enum ReminderError {
    /// Settings could not be read or written.
    #[error("Settings error: {0}")]
    Settings(String),

    /// The subscriber store could not be reached at all.
    #[error("Subscriber store unavailable: {0}")]
    StoreUnavailable(String),

    /// A single subscriber store operation failed.
    #[error("Subscriber store error: {0}")]
    Store(String),

    /// Subscriber not found.
    #[error("Subscriber not found: {0}")]
    SubscriberNotFound(SubscriberId),

    /// Notice not found.
    #[error("Notice not found: {0}")]
    NoticeNotFound(NoticeKey),

    /// Unknown trigger period key.
    #[error("Invalid trigger period: {0}")]
    InvalidPeriod(String),

    /// Unknown notice type.
    #[error("Invalid notice type: {0}")]
    InvalidNoticeType(String),

    /// Notification could not be delivered.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Audit note could not be recorded.
    #[error("Audit error: {0}")]
    Audit(String),

    /// Another run holds the scheduler lock.
    #[error("A reminder run is already in progress")]
    RunInProgress,

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReminderError {
    /// Whether this error must abort the whole run rather than the current item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Settings(_) | Self::StoreUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ReminderError::Settings("down".to_string()).is_fatal());
        assert!(ReminderError::StoreUnavailable("down".to_string()).is_fatal());
        assert!(!ReminderError::Store("row".to_string()).is_fatal());
        assert!(!ReminderError::Delivery("smtp".to_string()).is_fatal());
        assert!(!ReminderError::NoticeNotFound(3).is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = ReminderError::InvalidPeriod("+5days".to_string());
        assert!(err.to_string().contains("+5days"));
    }
}
