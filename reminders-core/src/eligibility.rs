//! Selection of subscribers whose expiration falls on a notice's trigger day.

use crate::error::Result;
use crate::hooks::ReminderHooks;
use crate::notice::{NoticeType, TriggerPeriod};
use crate::query::{Clause, EligibilityWindow, SubscriberQuery};
use crate::store::SubscriberStore;
use crate::subscriber::{SubscriberId, SubscriptionStatus};
use chrono::{DateTime, FixedOffset, Utc};
use tracing::debug;

/// Builds and runs eligibility queries.
pub struct EligibilityFilter<'a> {
    store: &'a dyn SubscriberStore,
    hooks: &'a ReminderHooks,
    now: DateTime<Utc>,
    offset: FixedOffset,
}

impl<'a> EligibilityFilter<'a> {
    pub fn new(
        store: &'a dyn SubscriberStore,
        hooks: &'a ReminderHooks,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            store,
            hooks,
            now,
            offset,
        }
    }

    /// The query for one period and type, after query hooks ran.
    ///
    /// Renewal: active, recurring, expiring inside the window.
    /// Expiration: not recurring, expiring inside the window, and expired when
    /// the period lies after expiration, active otherwise.
    pub fn build_query(&self, period: TriggerPeriod, notice_type: NoticeType) -> SubscriberQuery {
        let window = EligibilityWindow::for_period(self.now, self.offset, period);

        let mut query = match notice_type {
            NoticeType::Renewal => SubscriberQuery::new()
                .and(Clause::status(SubscriptionStatus::Active))
                .and(Clause::Recurring)
                .and(Clause::expires_within(window)),
            NoticeType::Expiration => {
                let status = if period.is_after_expiration() {
                    SubscriptionStatus::Expired
                } else {
                    SubscriptionStatus::Active
                };
                SubscriberQuery::new()
                    .and(Clause::NotRecurring)
                    .and(Clause::expires_within(window))
                    .and(Clause::status(status))
            }
        };

        self.hooks.apply_query(&mut query, period, notice_type);
        query
    }

    /// Ids of every matching subscriber. Empty when nobody matches.
    pub async fn select(
        &self,
        period: TriggerPeriod,
        notice_type: NoticeType,
    ) -> Result<Vec<SubscriberId>> {
        let query = self.build_query(period, notice_type);
        let ids = self.store.query(&query).await?;

        debug!(
            period = %period,
            notice_type = %notice_type,
            matched = ids.len(),
            "Eligibility query finished"
        );

        Ok(ids)
    }
}
