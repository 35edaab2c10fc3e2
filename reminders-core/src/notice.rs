//! Notice types, trigger periods and the notice record itself.

use crate::error::{ReminderError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of a notice inside the catalog. Insertion order is identity.
pub type NoticeKey = u32;

/// Default subject of a renewal notice.
pub const RENEWAL_SUBJECT: &str = "Your Subscription is About to Renew";

/// Default body of a renewal notice.
pub const RENEWAL_MESSAGE: &str =
    "Hello %name%,\n\nYour subscription for %subscription_name% will renew on %expiration%.";

/// Default subject of an expiration notice.
pub const EXPIRATION_SUBJECT: &str = "Your Subscription is About to Expire";

/// Default body of an expiration notice.
pub const EXPIRATION_MESSAGE: &str =
    "Hello %name%,\n\nYour subscription for %subscription_name% will expire on %expiration%.";

/// Kind of reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeType {
    /// Sent ahead of an automatic renewal.
    Renewal,
    /// Sent around the expiration of a non-recurring subscription.
    Expiration,
}

impl NoticeType {
    /// All notice types, in processing order.
    pub const ALL: [NoticeType; 2] = [NoticeType::Renewal, NoticeType::Expiration];

    /// Stored key.
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeType::Renewal => "renewal",
            NoticeType::Expiration => "expiration",
        }
    }

    /// Untranslated display label.
    pub fn label(&self) -> &'static str {
        match self {
            NoticeType::Renewal => "Renewal",
            NoticeType::Expiration => "Expiration",
        }
    }

    /// Settings key that turns this type of reminder on.
    pub fn enabled_key(&self) -> String {
        format!("send_{}_reminders", self.as_str())
    }
}

impl fmt::Display for NoticeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoticeType {
    type Err = ReminderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "renewal" => Ok(NoticeType::Renewal),
            "expiration" => Ok(NoticeType::Expiration),
            other => Err(ReminderError::InvalidNoticeType(other.to_string())),
        }
    }
}

/// Signed day offset from a subscription's expiration date.
///
/// Positive periods fire before expiration, negative ones after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerPeriod {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "+1day")]
    OneDayBefore,
    #[serde(rename = "+2days")]
    TwoDaysBefore,
    #[serde(rename = "+3days")]
    ThreeDaysBefore,
    #[serde(rename = "+1week")]
    OneWeekBefore,
    #[serde(rename = "+2weeks")]
    TwoWeeksBefore,
    #[serde(rename = "+1month")]
    OneMonthBefore,
    #[serde(rename = "+2months")]
    TwoMonthsBefore,
    #[serde(rename = "+3months")]
    ThreeMonthsBefore,
    #[serde(rename = "-1day")]
    OneDayAfter,
    #[serde(rename = "-2days")]
    TwoDaysAfter,
    #[serde(rename = "-3days")]
    ThreeDaysAfter,
    #[serde(rename = "-1week")]
    OneWeekAfter,
    #[serde(rename = "-2weeks")]
    TwoWeeksAfter,
    #[serde(rename = "-1month")]
    OneMonthAfter,
    #[serde(rename = "-2months")]
    TwoMonthsAfter,
    #[serde(rename = "-3months")]
    ThreeMonthsAfter,
}

impl TriggerPeriod {
    /// Every supported period, in display order.
    pub const ALL: [TriggerPeriod; 17] = [
        TriggerPeriod::Today,
        TriggerPeriod::OneDayBefore,
        TriggerPeriod::TwoDaysBefore,
        TriggerPeriod::ThreeDaysBefore,
        TriggerPeriod::OneWeekBefore,
        TriggerPeriod::TwoWeeksBefore,
        TriggerPeriod::OneMonthBefore,
        TriggerPeriod::TwoMonthsBefore,
        TriggerPeriod::ThreeMonthsBefore,
        TriggerPeriod::OneDayAfter,
        TriggerPeriod::TwoDaysAfter,
        TriggerPeriod::ThreeDaysAfter,
        TriggerPeriod::OneWeekAfter,
        TriggerPeriod::TwoWeeksAfter,
        TriggerPeriod::OneMonthAfter,
        TriggerPeriod::TwoMonthsAfter,
        TriggerPeriod::ThreeMonthsAfter,
    ];

    /// Signed offset in days.
    pub fn days(&self) -> i64 {
        match self {
            TriggerPeriod::Today => 0,
            TriggerPeriod::OneDayBefore => 1,
            TriggerPeriod::TwoDaysBefore => 2,
            TriggerPeriod::ThreeDaysBefore => 3,
            TriggerPeriod::OneWeekBefore => 7,
            TriggerPeriod::TwoWeeksBefore => 14,
            TriggerPeriod::OneMonthBefore => 30,
            TriggerPeriod::TwoMonthsBefore => 60,
            TriggerPeriod::ThreeMonthsBefore => 90,
            TriggerPeriod::OneDayAfter => -1,
            TriggerPeriod::TwoDaysAfter => -2,
            TriggerPeriod::ThreeDaysAfter => -3,
            TriggerPeriod::OneWeekAfter => -7,
            TriggerPeriod::TwoWeeksAfter => -14,
            TriggerPeriod::OneMonthAfter => -30,
            TriggerPeriod::TwoMonthsAfter => -60,
            TriggerPeriod::ThreeMonthsAfter => -90,
        }
    }

    /// Look a period up by its signed day offset.
    pub fn from_days(days: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.days() == days)
    }

    /// Whether the period fires after the expiration date.
    pub fn is_after_expiration(&self) -> bool {
        self.days() < 0
    }

    /// Stored key.
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerPeriod::Today => "today",
            TriggerPeriod::OneDayBefore => "+1day",
            TriggerPeriod::TwoDaysBefore => "+2days",
            TriggerPeriod::ThreeDaysBefore => "+3days",
            TriggerPeriod::OneWeekBefore => "+1week",
            TriggerPeriod::TwoWeeksBefore => "+2weeks",
            TriggerPeriod::OneMonthBefore => "+1month",
            TriggerPeriod::TwoMonthsBefore => "+2months",
            TriggerPeriod::ThreeMonthsBefore => "+3months",
            TriggerPeriod::OneDayAfter => "-1day",
            TriggerPeriod::TwoDaysAfter => "-2days",
            TriggerPeriod::ThreeDaysAfter => "-3days",
            TriggerPeriod::OneWeekAfter => "-1week",
            TriggerPeriod::TwoWeeksAfter => "-2weeks",
            TriggerPeriod::OneMonthAfter => "-1month",
            TriggerPeriod::TwoMonthsAfter => "-2months",
            TriggerPeriod::ThreeMonthsAfter => "-3months",
        }
    }

    /// Untranslated display label.
    pub fn label(&self) -> &'static str {
        match self {
            TriggerPeriod::Today => "The day of the renewal/expiration",
            TriggerPeriod::OneDayBefore => "One day before renewal/expiration",
            TriggerPeriod::TwoDaysBefore => "Two days before renewal/expiration",
            TriggerPeriod::ThreeDaysBefore => "Three days before renewal/expiration",
            TriggerPeriod::OneWeekBefore => "One week before renewal/expiration",
            TriggerPeriod::TwoWeeksBefore => "Two weeks before renewal/expiration",
            TriggerPeriod::OneMonthBefore => "One month before renewal/expiration",
            TriggerPeriod::TwoMonthsBefore => "Two months before renewal/expiration",
            TriggerPeriod::ThreeMonthsBefore => "Three months before renewal/expiration",
            TriggerPeriod::OneDayAfter => "One day after expiration",
            TriggerPeriod::TwoDaysAfter => "Two days after expiration",
            TriggerPeriod::ThreeDaysAfter => "Three days after expiration",
            TriggerPeriod::OneWeekAfter => "One week after expiration",
            TriggerPeriod::TwoWeeksAfter => "Two weeks after expiration",
            TriggerPeriod::OneMonthAfter => "One month after expiration",
            TriggerPeriod::TwoMonthsAfter => "Two months after expiration",
            TriggerPeriod::ThreeMonthsAfter => "Three months after expiration",
        }
    }
}

impl fmt::Display for TriggerPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerPeriod {
    type Err = ReminderError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == key)
            .ok_or_else(|| ReminderError::InvalidPeriod(key.to_string()))
    }
}

/// A configured reminder: template pair, trigger period and type.
///
/// Fields missing from stored data fall back to the renewal defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Notice {
    /// Reminder kind.
    #[serde(rename = "type")]
    pub notice_type: NoticeType,
    /// When the notice fires relative to expiration.
    pub send_period: TriggerPeriod,
    /// Subject template.
    pub subject: String,
    /// Body template.
    pub message: String,
}

impl Notice {
    /// Create a notice.
    pub fn new(
        notice_type: NoticeType,
        send_period: TriggerPeriod,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            notice_type,
            send_period,
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Built-in renewal notice, one month ahead.
    pub fn default_renewal() -> Self {
        Self::new(
            NoticeType::Renewal,
            TriggerPeriod::OneMonthBefore,
            RENEWAL_SUBJECT,
            RENEWAL_MESSAGE,
        )
    }

    /// Built-in expiration notice, one month ahead.
    pub fn default_expiration() -> Self {
        Self::new(
            NoticeType::Expiration,
            TriggerPeriod::OneMonthBefore,
            EXPIRATION_SUBJECT,
            EXPIRATION_MESSAGE,
        )
    }

    /// A notice is only sent when both templates are filled in.
    pub fn is_dispatchable(&self) -> bool {
        !self.subject.is_empty() && !self.message.is_empty()
    }
}

impl Default for Notice {
    fn default() -> Self {
        Self::default_renewal()
    }
}
