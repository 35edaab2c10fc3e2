//! Cron expression parsing and evaluation.

use crate::error::{CronError, CronResult};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use cron::Schedule;
use std::str::FromStr;

/// Parsed cron expression, evaluated in a fixed UTC offset.
#[derive(Debug, Clone)]
pub struct CronExpression {
    schedule: Schedule,
    expression: String,
    offset: FixedOffset,
}

impl CronExpression {
    /// Parse a six-field expression (`sec min hour day-of-month month day-of-week`).
    ///
    /// # Examples
    ///
    /// ```
    /// use reminders_cron::CronExpression;
    ///
    /// // Every day at midnight
    /// let expr = CronExpression::parse("0 0 0 * * *").unwrap();
    ///
    /// // Every Monday at 9 AM
    /// let expr = CronExpression::parse("0 0 9 * * MON").unwrap();
    /// ```
    pub fn parse(expression: &str) -> CronResult<Self> {
        let schedule = Schedule::from_str(expression)
            .map_err(|e| CronError::InvalidExpression(format!("{}: {}", expression, e)))?;

        Ok(Self {
            schedule,
            expression: expression.to_string(),
            offset: Utc.fix(),
        })
    }

    /// Evaluate hour and day fields in `offset` instead of UTC.
    pub fn in_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// The first fire time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule
            .after(&after.with_timezone(&self.offset))
            .next()
            .map(|t| t.with_timezone(&Utc))
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

/// Common cron expression presets.
pub struct CronPresets;

impl CronPresets {
    pub const EVERY_MINUTE: &'static str = "0 * * * * *";

    pub const EVERY_HOUR: &'static str = "0 0 * * * *";

    /// Every day at midnight
    pub const DAILY: &'static str = "0 0 0 * * *";
}
