//! Extension points.
//!
//! Each list runs in registration order and mutates the value in place before
//! it is returned to the caller or used by the engine.

use crate::catalog::NoticeCatalog;
use crate::notice::{Notice, NoticeKey, NoticeType, TriggerPeriod};
use crate::query::SubscriberQuery;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Adjusts which notice types are enabled.
pub type EnabledHook = Arc<dyn Fn(&mut BTreeMap<NoticeType, bool>) + Send + Sync>;

/// Adjusts the labelled list of notice types.
pub type NoticeTypesHook = Arc<dyn Fn(&mut Vec<(NoticeType, String)>) + Send + Sync>;

/// Adjusts the labelled list of trigger periods.
pub type PeriodsHook = Arc<dyn Fn(&mut Vec<(TriggerPeriod, String)>) + Send + Sync>;

/// Adjusts a notice list. The type filter that produced it is passed along.
pub type NoticesHook = Arc<dyn Fn(&mut NoticeCatalog, Option<NoticeType>) + Send + Sync>;

/// Adjusts a single notice returned by `get_notice`.
pub type NoticeHook = Arc<dyn Fn(&mut Notice, NoticeKey) + Send + Sync>;

/// Adjusts a label. Receives the notice key the label belongs to.
pub type LabelHook = Arc<dyn Fn(&mut String, NoticeKey) + Send + Sync>;

/// Adds clauses to an eligibility query before it runs.
pub type QueryHook = Arc<dyn Fn(&mut SubscriberQuery, TriggerPeriod, NoticeType) + Send + Sync>;

/// Registered extension points.
#[derive(Clone, Default)]
pub struct ReminderHooks {
    enabled: Vec<EnabledHook>,
    notice_types: Vec<NoticeTypesHook>,
    periods: Vec<PeriodsHook>,
    notices: Vec<NoticesHook>,
    notice: Vec<NoticeHook>,
    period_label: Vec<LabelHook>,
    type_label: Vec<LabelHook>,
    query: Vec<QueryHook>,
}

impl ReminderHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_enabled(
        mut self,
        hook: impl Fn(&mut BTreeMap<NoticeType, bool>) + Send + Sync + 'static,
    ) -> Self {
        self.enabled.push(Arc::new(hook));
        self
    }

    pub fn on_notice_types(
        mut self,
        hook: impl Fn(&mut Vec<(NoticeType, String)>) + Send + Sync + 'static,
    ) -> Self {
        self.notice_types.push(Arc::new(hook));
        self
    }

    pub fn on_periods(
        mut self,
        hook: impl Fn(&mut Vec<(TriggerPeriod, String)>) + Send + Sync + 'static,
    ) -> Self {
        self.periods.push(Arc::new(hook));
        self
    }

    pub fn on_notices(
        mut self,
        hook: impl Fn(&mut NoticeCatalog, Option<NoticeType>) + Send + Sync + 'static,
    ) -> Self {
        self.notices.push(Arc::new(hook));
        self
    }

    pub fn on_notice(mut self, hook: impl Fn(&mut Notice, NoticeKey) + Send + Sync + 'static) -> Self {
        self.notice.push(Arc::new(hook));
        self
    }

    pub fn on_period_label(
        mut self,
        hook: impl Fn(&mut String, NoticeKey) + Send + Sync + 'static,
    ) -> Self {
        self.period_label.push(Arc::new(hook));
        self
    }

    pub fn on_type_label(
        mut self,
        hook: impl Fn(&mut String, NoticeKey) + Send + Sync + 'static,
    ) -> Self {
        self.type_label.push(Arc::new(hook));
        self
    }

    pub fn on_query(
        mut self,
        hook: impl Fn(&mut SubscriberQuery, TriggerPeriod, NoticeType) + Send + Sync + 'static,
    ) -> Self {
        self.query.push(Arc::new(hook));
        self
    }

    pub(crate) fn apply_enabled(&self, enabled: &mut BTreeMap<NoticeType, bool>) {
        self.enabled.iter().for_each(|h| h(enabled));
    }

    pub(crate) fn apply_notice_types(&self, types: &mut Vec<(NoticeType, String)>) {
        self.notice_types.iter().for_each(|h| h(types));
    }

    pub(crate) fn apply_periods(&self, periods: &mut Vec<(TriggerPeriod, String)>) {
        self.periods.iter().for_each(|h| h(periods));
    }

    pub(crate) fn apply_notices(&self, notices: &mut NoticeCatalog, filter: Option<NoticeType>) {
        self.notices.iter().for_each(|h| h(notices, filter));
    }

    pub(crate) fn apply_notice(&self, notice: &mut Notice, key: NoticeKey) {
        self.notice.iter().for_each(|h| h(notice, key));
    }

    pub(crate) fn apply_period_label(&self, label: &mut String, key: NoticeKey) {
        self.period_label.iter().for_each(|h| h(label, key));
    }

    pub(crate) fn apply_type_label(&self, label: &mut String, key: NoticeKey) {
        self.type_label.iter().for_each(|h| h(label, key));
    }

    pub(crate) fn apply_query(
        &self,
        query: &mut SubscriberQuery,
        period: TriggerPeriod,
        notice_type: NoticeType,
    ) {
        self.query.iter().for_each(|h| h(query, period, notice_type));
    }
}

impl std::fmt::Debug for ReminderHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderHooks")
            .field("enabled", &self.enabled.len())
            .field("notice_types", &self.notice_types.len())
            .field("periods", &self.periods.len())
            .field("notices", &self.notices.len())
            .field("notice", &self.notice.len())
            .field("query", &self.query.len())
            .finish()
    }
}
