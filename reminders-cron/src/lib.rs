//! Cron scheduling for recurring reminder runs.
//!
//! Provides:
//! - Six-field cron expressions evaluated in a fixed UTC offset
//! - Named async jobs with status and run counts
//! - A tick-based scheduler that never overlaps a job with itself
//!
//! ## Cron Expressions
//!
//! ```
//! use chrono::{FixedOffset, TimeZone, Utc};
//! use reminders_cron::{CronExpression, CronPresets};
//!
//! let expr = CronExpression::parse(CronPresets::DAILY)
//!     .unwrap()
//!     .in_offset(FixedOffset::west_opt(5 * 3600).unwrap());
//!
//! let now = Utc.with_ymd_and_hms(2024, 9, 15, 12, 0, 0).unwrap();
//! let next = expr.next_after(now).unwrap();
//! assert_eq!(next, Utc.with_ymd_and_hms(2024, 9, 16, 5, 0, 0).unwrap());
//! ```

pub mod error;
pub mod expression;
pub mod job;
pub mod scheduler;

pub use error::{CronError, CronResult};
pub use expression::{CronExpression, CronPresets};
pub use job::{Job, JobContext, JobFn, JobStatus};
pub use scheduler::{CronScheduler, JobStats, SchedulerConfig};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{CronError, CronResult};
    pub use crate::expression::{CronExpression, CronPresets};
    pub use crate::job::{JobContext, JobStatus};
    pub use crate::scheduler::{CronScheduler, SchedulerConfig};
}
