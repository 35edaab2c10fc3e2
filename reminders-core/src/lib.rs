//! Renewal and expiration reminders for membership subscriptions.
//!
//! Provides:
//! - A catalog of reminder notices (subject, body, trigger period, type)
//! - Day-window eligibility queries over a subscriber store
//! - A scheduler that sends each notice at most once per subscription
//! - Operator preview sends with sample values
//!
//! Storage, delivery and audit are collaborator traits in [`store`]; in-memory
//! versions live in [`memory`].
//!
//! ## Quick Start
//!
//! ```
//! use reminders_core::prelude::*;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let settings = MemorySettingsStore::new()
//!     .with_option("send_renewal_reminders", serde_json::json!(true));
//! let subscribers = MemorySubscriberStore::new();
//! let sender = MemorySender::new();
//!
//! let scheduler = ReminderScheduler::new(
//!     Arc::new(settings),
//!     Arc::new(subscribers),
//!     Arc::new(sender.clone()),
//!     Arc::new(MemoryAuditLog::new()),
//! );
//!
//! let report = scheduler.run().await.unwrap();
//! assert_eq!(report.sent, 0);
//! # });
//! ```

pub mod catalog;
pub mod clock;
pub mod eligibility;
pub mod error;
pub mod hooks;
pub mod memory;
pub mod notice;
pub mod preview;
pub mod query;
pub mod scheduler;
pub mod settings;
pub mod store;
pub mod subscriber;
pub mod tags;

pub use catalog::NoticeCatalog;
pub use clock::{Clock, FixedClock, SystemClock};
pub use eligibility::EligibilityFilter;
pub use error::{ReminderError, Result};
pub use hooks::ReminderHooks;
pub use notice::{Notice, NoticeKey, NoticeType, TriggerPeriod};
pub use preview::{RenderedNotice, TestNoticeRenderer};
pub use query::{Clause, EligibilityWindow, MetaCompare, SubscriberQuery};
pub use scheduler::{ReminderScheduler, RunReport};
pub use settings::ReminderSettings;
pub use store::{
    AuditLog, Localization, NoTranslation, NotificationSender, SettingsStore, SettingsStoreExt,
    SubscriberStore,
};
pub use subscriber::{SentMarker, Subscriber, SubscriberId, SubscriptionStatus};
pub use tags::TemplateTags;

/// Prelude for common imports.
///
/// ```
/// use reminders_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::catalog::NoticeCatalog;
    pub use crate::clock::{Clock, FixedClock, SystemClock};
    pub use crate::error::{ReminderError, Result};
    pub use crate::hooks::ReminderHooks;
    pub use crate::memory::{
        MemoryAuditLog, MemorySender, MemorySettingsStore, MemorySubscriberStore,
    };
    pub use crate::notice::{Notice, NoticeKey, NoticeType, TriggerPeriod};
    pub use crate::preview::{RenderedNotice, TestNoticeRenderer};
    pub use crate::query::{Clause, MetaCompare, SubscriberQuery};
    pub use crate::scheduler::{ReminderScheduler, RunReport};
    pub use crate::store::{
        AuditLog, Localization, NotificationSender, SettingsStore, SettingsStoreExt,
        SubscriberStore,
    };
    pub use crate::subscriber::{Subscriber, SubscriberId, SubscriptionStatus};
}
