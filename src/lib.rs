//! Membership Reminders
//!
//! Renewal and expiration reminder emails for membership sites. This crate
//! wires the engine in [`reminders_core`] to file-backed subscribers, SMTP
//! delivery, a JSON-lines audit trail and a cron schedule, and ships the
//! `reminders` command.
//!
//! ```no_run
//! use reminders::prelude::*;
//!
//! # async fn example() -> Result<(), AppError> {
//! let config = ConfigManager::builder()
//!     .add_file("reminders.toml")
//!     .load_dotenv(None)
//!     .build()?;
//!
//! let service = ReminderService::open(config).await?;
//! let report = service.run_once().await?;
//! println!("{} reminders sent", report.sent);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod lock;
pub mod logging;
pub mod service;
pub mod subscribers;

pub use error::{AppError, AppResult};
pub use lock::StorageLock;
pub use service::{ReminderService, run_daemon};
pub use subscribers::JsonSubscriberStore;

pub use reminders_audit;
pub use reminders_config;
pub use reminders_core;
pub use reminders_cron;
pub use reminders_mail;

pub mod prelude {
    pub use crate::error::{AppError, AppResult};
    pub use crate::logging::{LogConfig, LogFormat, LogLevel};
    pub use crate::service::{ReminderService, run_daemon};
    pub use crate::subscribers::JsonSubscriberStore;
    pub use reminders_config::{ConfigManager, DeliveryConfig, StorageConfig};
    pub use reminders_core::{
        Notice, NoticeKey, NoticeType, ReminderScheduler, RunReport, Subscriber,
        SubscriptionStatus, TriggerPeriod,
    };
}
