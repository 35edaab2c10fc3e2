//! Subscriber records as seen by the reminder engine.

use crate::notice::NoticeKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Subscriber identifier.
pub type SubscriberId = u64;

/// Subscription status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Pending,
    Cancelled,
    Free,
    /// Any status this engine has no rules for.
    #[serde(untagged)]
    Other(String),
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Free => "free",
            SubscriptionStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A member and the subscription they currently hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    #[serde(default)]
    pub login: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub display_name: String,
    pub status: SubscriptionStatus,
    /// `None` when the recurring flag was never set.
    #[serde(default)]
    pub recurring: Option<bool>,
    #[serde(default)]
    pub trialing: bool,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub subscription_id: Option<u64>,
    #[serde(default)]
    pub subscription_name: String,
    #[serde(default)]
    pub subscription_key: String,
    #[serde(default)]
    pub recurring_amount: Option<f64>,
    /// Free-form metadata, including sent markers.
    #[serde(default)]
    pub meta: HashMap<String, String>,
}

impl Subscriber {
    /// Create a subscriber with the fields the engine needs.
    pub fn new(id: SubscriberId, email: impl Into<String>, status: SubscriptionStatus) -> Self {
        Self {
            id,
            login: String::new(),
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            display_name: String::new(),
            status,
            recurring: None,
            trialing: false,
            expires_at: None,
            subscription_id: None,
            subscription_name: String::new(),
            subscription_key: String::new(),
            recurring_amount: None,
            meta: HashMap::new(),
        }
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        self.login = login.into();
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn recurring(mut self, recurring: bool) -> Self {
        self.recurring = Some(recurring);
        self
    }

    pub fn trialing(mut self, trialing: bool) -> Self {
        self.trialing = trialing;
        self
    }

    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn subscription(mut self, id: u64, name: impl Into<String>) -> Self {
        self.subscription_id = Some(id);
        self.subscription_name = name.into();
        self
    }

    pub fn with_subscription_key(mut self, key: impl Into<String>) -> Self {
        self.subscription_key = key.into();
        self
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.recurring_amount = Some(amount);
        self
    }

    /// Whether the subscription renews automatically.
    pub fn is_recurring(&self) -> bool {
        self.recurring.unwrap_or(false)
    }

    /// Key of the marker recording that `notice` went out for the current subscription.
    pub fn sent_marker_key(&self, notice: NoticeKey) -> String {
        SentMarker::key(self.subscription_id, notice)
    }
}

/// "Notice already delivered for this subscription cycle" fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMarker {
    pub subscriber: SubscriberId,
    pub key: String,
    pub sent_at: DateTime<Utc>,
}

impl SentMarker {
    /// Prefix shared by every marker key.
    pub const PREFIX: &'static str = "_reminder_sent_";

    pub fn new(subscriber: &Subscriber, notice: NoticeKey, sent_at: DateTime<Utc>) -> Self {
        Self {
            subscriber: subscriber.id,
            key: subscriber.sent_marker_key(notice),
            sent_at,
        }
    }

    /// Metadata key for a (subscription, notice) pair.
    pub fn key(subscription_id: Option<u64>, notice: NoticeKey) -> String {
        let subscription = subscription_id.map(|id| id.to_string()).unwrap_or_default();
        sanitize_key(&format!("{}{}_{}", Self::PREFIX, subscription, notice))
    }

    /// Stored value: unix seconds of the send.
    pub fn value(&self) -> String {
        self.sent_at.timestamp().to_string()
    }

    /// Whether a stored marker value records a delivery.
    pub fn is_set(value: Option<&str>) -> bool {
        matches!(value, Some(v) if !v.is_empty() && v != "0")
    }
}

/// Lower-case and drop everything outside `[a-z0-9_-]`.
pub fn sanitize_key(key: &str) -> String {
    key.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .collect()
}
