//! Error types for cron operations.

use thiserror::Error;

/// Result type for cron operations.
pub type CronResult<T> = Result<T, CronError>;

/// Cron-specific errors.
#[derive(Debug, Error)]
pub enum CronError {
    /// Invalid cron expression
    #[error("Invalid cron expression: {0}")]
    InvalidExpression(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job already exists: {0}")]
    JobAlreadyExists(String),

    /// The job body returned an error
    #[error("Job execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Scheduler not running")]
    SchedulerNotRunning,

    #[error("Scheduler already running")]
    SchedulerAlreadyRunning,
}

impl CronError {
    /// Wrap any displayable job failure.
    pub fn execution(err: impl std::fmt::Display) -> Self {
        Self::ExecutionFailed(err.to_string())
    }
}
