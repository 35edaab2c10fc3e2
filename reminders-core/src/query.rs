//! Subscriber query predicates.
//!
//! A [`SubscriberQuery`] is a conjunction of [`Clause`]s. Stores may translate
//! it to their own query language or evaluate it with [`SubscriberQuery::matches`].

use crate::notice::TriggerPeriod;
use crate::subscriber::{Subscriber, SubscriptionStatus};
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One calendar day, in the site's local time, expressed as UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityWindow {
    start: DateTime<Utc>,
}

impl EligibilityWindow {
    /// The local calendar day that lies `period` days from `now`.
    pub fn for_period(now: DateTime<Utc>, offset: FixedOffset, period: TriggerPeriod) -> Self {
        let today = now.with_timezone(&offset).date_naive();
        let day = today + Duration::days(period.days());
        let local_midnight: NaiveDateTime = day.and_time(chrono::NaiveTime::MIN);
        let utc = local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()));

        Self {
            start: DateTime::from_naive_utc_and_offset(utc, Utc),
        }
    }

    /// 00:00:00 local.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// 23:59:59 local.
    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::days(1) - Duration::seconds(1)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.start + Duration::days(1)
    }
}

/// Comparison for generic metadata clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaCompare {
    Equals,
    NotEquals,
    Exists,
    NotExists,
}

/// A single predicate over a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "clause")]
pub enum Clause {
    /// Subscription status equals.
    Status { status: SubscriptionStatus },
    /// Recurring flag set to true.
    Recurring,
    /// Recurring flag absent or false.
    NotRecurring,
    /// Expiration date falls inside the window.
    ExpiresWithin { window: EligibilityWindow },
    /// Free-form metadata predicate.
    Meta {
        key: String,
        compare: MetaCompare,
        value: Option<String>,
    },
}

impl Clause {
    pub fn status(status: SubscriptionStatus) -> Self {
        Clause::Status { status }
    }

    pub fn expires_within(window: EligibilityWindow) -> Self {
        Clause::ExpiresWithin { window }
    }

    pub fn meta(key: impl Into<String>, compare: MetaCompare, value: Option<String>) -> Self {
        Clause::Meta {
            key: key.into(),
            compare,
            value,
        }
    }

    /// Evaluate against a loaded subscriber.
    pub fn matches(&self, subscriber: &Subscriber) -> bool {
        match self {
            Clause::Status { status } => &subscriber.status == status,
            Clause::Recurring => subscriber.recurring == Some(true),
            Clause::NotRecurring => subscriber.recurring != Some(true),
            Clause::ExpiresWithin { window } => subscriber
                .expires_at
                .is_some_and(|at| window.contains(at)),
            Clause::Meta {
                key,
                compare,
                value,
            } => {
                let stored = subscriber.meta.get(key);
                match compare {
                    MetaCompare::Exists => stored.is_some(),
                    MetaCompare::NotExists => stored.is_none(),
                    MetaCompare::Equals => stored == value.as_ref(),
                    MetaCompare::NotEquals => stored != value.as_ref(),
                }
            }
        }
    }
}

/// Conjunction of clauses. No result limit is applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriberQuery {
    pub clauses: Vec<Clause>,
}

impl SubscriberQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clause.
    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    /// True when every clause holds. An empty query matches everyone.
    pub fn matches(&self, subscriber: &Subscriber) -> bool {
        self.clauses.iter().all(|c| c.matches(subscriber))
    }
}
