//! Daily reminder dispatch and notice configuration access.

use crate::catalog::NoticeCatalog;
use crate::clock::{Clock, SystemClock};
use crate::eligibility::EligibilityFilter;
use crate::error::{ReminderError, Result};
use crate::hooks::ReminderHooks;
use crate::notice::{Notice, NoticeKey, NoticeType, TriggerPeriod};
use crate::preview::{RenderedNotice, TestNoticeRenderer};
use crate::settings::{ReminderSettings, load_catalog, save_catalog};
use crate::store::{
    AuditLog, Localization, NoTranslation, NotificationSender, SettingsStore, SubscriberStore,
};
use crate::subscriber::{SentMarker, SubscriberId};
use crate::tags::TemplateTags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Counters for one `run()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Notices delivered.
    pub sent: usize,
    /// Subscribers or notices whose processing failed.
    pub failed: usize,
    /// Skipped because a sent marker exists.
    pub already_notified: usize,
    /// Skipped by the recurring/trialing rule.
    pub excluded: usize,
    /// Notices skipped for a missing subject or message.
    pub incomplete_notices: usize,
    /// Notices whose query matched nobody.
    pub notices_without_recipients: usize,
}

/// What happened to one subscriber for one notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Sent,
    Excluded,
    AlreadyNotified,
}

/// Sends each eligible subscriber each notice at most once per subscription.
pub struct ReminderScheduler {
    settings: Arc<dyn SettingsStore>,
    subscribers: Arc<dyn SubscriberStore>,
    sender: Arc<dyn NotificationSender>,
    audit: Arc<dyn AuditLog>,
    clock: Arc<dyn Clock>,
    localization: Arc<dyn Localization>,
    hooks: ReminderHooks,
    run_lock: Mutex<()>,
}

impl ReminderScheduler {
    /// Create a scheduler on the wall clock, with no hooks and no translation.
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        subscribers: Arc<dyn SubscriberStore>,
        sender: Arc<dyn NotificationSender>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            settings,
            subscribers,
            sender,
            audit,
            clock: Arc::new(SystemClock),
            localization: Arc::new(NoTranslation),
            hooks: ReminderHooks::new(),
            run_lock: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_localization(mut self, localization: impl Localization + 'static) -> Self {
        self.localization = Arc::new(localization);
        self
    }

    pub fn with_hooks(mut self, hooks: ReminderHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn hooks(&self) -> &ReminderHooks {
        &self.hooks
    }

    /// Run one dispatch cycle.
    ///
    /// Per-notice and per-subscriber failures are logged and counted. Fatal
    /// errors abort the run; notices already sent stay sent.
    ///
    /// # Errors
    ///
    /// [`ReminderError::RunInProgress`] when another run holds the lock,
    /// [`ReminderError::Settings`] when settings cannot be read, and
    /// [`ReminderError::StoreUnavailable`] when the subscriber store is down.
    pub async fn run(&self) -> Result<RunReport> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| ReminderError::RunInProgress)?;

        let settings = ReminderSettings::load(self.settings.as_ref()).await?;
        let now = self.clock.now();
        let enabled = self.apply_enabled_policy(&settings);
        let filter = EligibilityFilter::new(
            self.subscribers.as_ref(),
            &self.hooks,
            now,
            settings.utc_offset,
        );

        info!(now = %now, "Starting reminder run");
        let mut report = RunReport::default();

        for notice_type in NoticeType::ALL {
            if !enabled.get(&notice_type).copied().unwrap_or(false) {
                debug!(notice_type = %notice_type, "Reminders disabled, skipping");
                continue;
            }

            let mut notices = settings.notices.of_type(notice_type);
            self.hooks.apply_notices(&mut notices, Some(notice_type));

            for (key, notice) in notices.iter() {
                if !notice.is_dispatchable() {
                    debug!(notice = key, "Notice has no subject or message, skipping");
                    report.incomplete_notices += 1;
                    continue;
                }

                let ids = match filter.select(notice.send_period, notice_type).await {
                    Ok(ids) => ids,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!(notice = key, error = %e, "Eligibility query failed");
                        report.failed += 1;
                        continue;
                    }
                };

                if ids.is_empty() {
                    report.notices_without_recipients += 1;
                    continue;
                }

                for id in ids {
                    match self
                        .process_subscriber(&settings, now, key, notice, id)
                        .await
                    {
                        Ok(Outcome::Sent) => report.sent += 1,
                        Ok(Outcome::Excluded) => report.excluded += 1,
                        Ok(Outcome::AlreadyNotified) => report.already_notified += 1,
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => {
                            warn!(notice = key, subscriber = id, error = %e, "Reminder failed");
                            report.failed += 1;
                        }
                    }
                }
            }
        }

        info!(
            sent = report.sent,
            failed = report.failed,
            already_notified = report.already_notified,
            excluded = report.excluded,
            "Reminder run finished"
        );

        Ok(report)
    }

    async fn process_subscriber(
        &self,
        settings: &ReminderSettings,
        now: DateTime<Utc>,
        key: NoticeKey,
        notice: &Notice,
        id: SubscriberId,
    ) -> Result<Outcome> {
        let subscriber = self.subscribers.get(id).await?;

        // Auto-renewing and trial subscriptions never get expiration notices.
        if notice.notice_type == NoticeType::Expiration
            && (subscriber.is_recurring() || subscriber.trialing)
        {
            debug!(notice = key, subscriber = id, "Excluded from expiration notice");
            return Ok(Outcome::Excluded);
        }

        let marker = SentMarker::new(&subscriber, key, now);
        let stored = self.subscribers.read_meta(id, &marker.key).await?;
        if SentMarker::is_set(stored.as_deref()) {
            return Ok(Outcome::AlreadyNotified);
        }

        let tags = TemplateTags::for_subscriber(
            &subscriber,
            &settings.site_name,
            &settings.date_format,
            settings.utc_offset,
        );
        let subject = tags.render(&notice.subject);
        let body = tags.render(&notice.message);

        self.sender.send(&subscriber.email, &subject, &body).await?;

        info!(
            notice = key,
            subscriber = id,
            notice_type = %notice.notice_type,
            "Reminder sent"
        );

        let note = format!(
            "{} notice was emailed to the member.",
            self.localization.translate(notice.notice_type.label())
        );
        if let Err(e) = self.audit.append_note(id, &note).await {
            warn!(subscriber = id, error = %e, "Failed to record audit note");
        }

        // A cleared marker ("" or "0") still occupies the key and is overwritten.
        let written = if stored.is_some() {
            self.subscribers
                .write_meta(id, &marker.key, &marker.value())
                .await
                .map(|_| true)
        } else {
            self.subscribers
                .insert_meta_if_absent(id, &marker.key, &marker.value())
                .await
        };

        match written {
            Ok(true) => {}
            Ok(false) => debug!(subscriber = id, key = %marker.key, "Sent marker already present"),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!(subscriber = id, key = %marker.key, error = %e, "Failed to write sent marker");
            }
        }

        Ok(Outcome::Sent)
    }

    fn apply_enabled_policy(&self, settings: &ReminderSettings) -> BTreeMap<NoticeType, bool> {
        let mut enabled = settings.enabled.clone();
        self.hooks.apply_enabled(&mut enabled);
        enabled
    }

    /// Which notice types are switched on, after policy hooks.
    pub async fn enabled(&self) -> Result<BTreeMap<NoticeType, bool>> {
        let settings = ReminderSettings::load(self.settings.as_ref()).await?;
        Ok(self.apply_enabled_policy(&settings))
    }

    /// Notice types with their translated labels.
    pub fn list_notice_types(&self) -> Vec<(NoticeType, String)> {
        let mut types: Vec<(NoticeType, String)> = NoticeType::ALL
            .into_iter()
            .map(|t| (t, self.localization.translate(t.label())))
            .collect();
        self.hooks.apply_notice_types(&mut types);
        types
    }

    /// Trigger periods with their translated labels.
    pub fn list_periods(&self) -> Vec<(TriggerPeriod, String)> {
        let mut periods: Vec<(TriggerPeriod, String)> = TriggerPeriod::ALL
            .into_iter()
            .map(|p| (p, self.localization.translate(p.label())))
            .collect();
        self.hooks.apply_periods(&mut periods);
        periods
    }

    /// One notice. An unknown key resolves to the first notice in the catalog.
    pub async fn get_notice(&self, key: NoticeKey) -> Result<(NoticeKey, Notice)> {
        let catalog = load_catalog(self.settings.as_ref()).await?;

        let (key, mut notice) = match catalog.get(key) {
            Some(notice) => (key, notice.clone()),
            None => catalog
                .first()
                .map(|(k, n)| (k, n.clone()))
                .ok_or(ReminderError::NoticeNotFound(key))?,
        };

        self.hooks.apply_notice(&mut notice, key);
        Ok((key, notice))
    }

    /// Every notice, or only those of one type.
    pub async fn list_notices(&self, filter: Option<NoticeType>) -> Result<NoticeCatalog> {
        let catalog = load_catalog(self.settings.as_ref()).await?;
        let mut notices = match filter {
            Some(notice_type) => catalog.of_type(notice_type),
            None => catalog,
        };
        self.hooks.apply_notices(&mut notices, filter);
        Ok(notices)
    }

    /// Translated label of a notice's trigger period.
    pub async fn notice_period_label(&self, key: NoticeKey) -> Result<String> {
        let (key, notice) = self.get_notice(key).await?;
        let mut label = self.localization.translate(notice.send_period.label());
        self.hooks.apply_period_label(&mut label, key);
        Ok(label)
    }

    /// Translated label of a notice's type.
    pub async fn notice_type_label(&self, key: NoticeKey) -> Result<String> {
        let (key, notice) = self.get_notice(key).await?;
        let mut label = self.localization.translate(notice.notice_type.label());
        self.hooks.apply_type_label(&mut label, key);
        Ok(label)
    }

    /// Store a notice. `None` appends it; `Some(key)` replaces or creates that key.
    pub async fn save_notice(&self, key: Option<NoticeKey>, notice: Notice) -> Result<NoticeKey> {
        let mut catalog = load_catalog(self.settings.as_ref()).await?;
        let key = match key {
            Some(key) => {
                catalog.update(key, notice);
                key
            }
            None => catalog.insert(notice),
        };
        save_catalog(self.settings.as_ref(), &catalog).await?;

        info!(notice = key, "Notice saved");
        Ok(key)
    }

    /// Remove a notice and return it.
    pub async fn delete_notice(&self, key: NoticeKey) -> Result<Notice> {
        let mut catalog = load_catalog(self.settings.as_ref()).await?;
        let removed = catalog
            .remove(key)
            .ok_or(ReminderError::NoticeNotFound(key))?;
        save_catalog(self.settings.as_ref(), &catalog).await?;

        info!(notice = key, "Notice deleted");
        Ok(removed)
    }

    /// Render a notice with sample values and send it to `to`.
    ///
    /// No sent marker is written. Delivery failures are returned.
    pub async fn send_test_notice(&self, key: NoticeKey, to: &str) -> Result<RenderedNotice> {
        let settings = ReminderSettings::load(self.settings.as_ref()).await?;
        let (_, notice) = self.get_notice(key).await?;
        let today = self.clock.now().with_timezone(&settings.utc_offset);

        TestNoticeRenderer::new(self.sender.clone())
            .send(&notice, today, to)
            .await
    }
}

impl std::fmt::Debug for ReminderScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderScheduler")
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::memory::{MemoryAuditLog, MemorySender, MemorySettingsStore, MemorySubscriberStore};
    use crate::subscriber::{Subscriber, SubscriptionStatus};
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    struct Fixture {
        settings: MemorySettingsStore,
        subscribers: MemorySubscriberStore,
        sender: MemorySender,
        audit: MemoryAuditLog,
    }

    impl Fixture {
        fn new(subscribers: Vec<Subscriber>) -> Self {
            Self {
                settings: MemorySettingsStore::new()
                    .with_option("send_renewal_reminders", json!(true))
                    .with_option("send_expiration_reminders", json!(true)),
                subscribers: MemorySubscriberStore::from_subscribers(subscribers),
                sender: MemorySender::new(),
                audit: MemoryAuditLog::new(),
            }
        }

        fn scheduler(&self) -> ReminderScheduler {
            ReminderScheduler::new(
                Arc::new(self.settings.clone()),
                Arc::new(self.subscribers.clone()),
                Arc::new(self.sender.clone()),
                Arc::new(self.audit.clone()),
            )
            .with_clock(FixedClock(now()))
        }
    }

    fn renewing(id: SubscriberId) -> Subscriber {
        Subscriber::new(id, format!("member{}@example.com", id), SubscriptionStatus::Active)
            .with_name("Ada", "Lovelace")
            .subscription(id * 10, "Gold")
            .recurring(true)
            .expires_at(now() + Duration::days(30))
    }

    #[tokio::test]
    async fn test_run_sends_renders_and_marks() {
        let fixture = Fixture::new(vec![renewing(1)]);
        let report = fixture.scheduler().run().await.unwrap();

        assert_eq!(report.sent, 1);
        let sent = fixture.sender.sent_to("member1@example.com").await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Your Subscription is About to Renew");
        assert_eq!(
            sent[0].body,
            "Hello Ada,\n\nYour subscription for Gold will renew on July 1, 2024."
        );

        let marker = fixture
            .subscribers
            .read_meta(1, "_reminder_sent_10_0")
            .await
            .unwrap();
        assert_eq!(marker, Some(now().timestamp().to_string()));
        assert_eq!(
            fixture.audit.notes_for(1).await,
            vec!["Renewal notice was emailed to the member.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_disabled_type_is_skipped() {
        let fixture = Fixture::new(vec![renewing(1)]);
        fixture
            .settings
            .set_option("send_renewal_reminders", json!(false))
            .await
            .unwrap();

        let report = fixture.scheduler().run().await.unwrap();
        assert_eq!(report.sent, 0);
        // Only the expiration notice ran, and the recurring member does not match it.
        assert_eq!(report.notices_without_recipients, 1);
        assert!(fixture.sender.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_enabled_policy_hook_overrides_settings() {
        let fixture = Fixture::new(vec![renewing(1)]);
        let scheduler = fixture.scheduler().with_hooks(
            ReminderHooks::new().on_enabled(|enabled| {
                enabled.insert(NoticeType::Renewal, false);
            }),
        );

        let enabled = scheduler.enabled().await.unwrap();
        assert_eq!(enabled.get(&NoticeType::Renewal), Some(&false));
        assert_eq!(enabled.get(&NoticeType::Expiration), Some(&true));

        assert_eq!(scheduler.run().await.unwrap().sent, 0);
    }

    #[tokio::test]
    async fn test_concurrent_run_is_rejected() {
        let fixture = Fixture::new(vec![]);
        let scheduler = fixture.scheduler();

        let _held = scheduler.run_lock.lock().await;
        assert!(matches!(
            scheduler.run().await,
            Err(ReminderError::RunInProgress)
        ));
    }

    #[tokio::test]
    async fn test_notice_accessors() {
        let fixture = Fixture::new(vec![]);
        let scheduler = fixture.scheduler();

        let (key, notice) = scheduler.get_notice(1).await.unwrap();
        assert_eq!(key, 1);
        assert_eq!(notice.notice_type, NoticeType::Expiration);

        // Unknown keys resolve to the first notice.
        let (key, notice) = scheduler.get_notice(42).await.unwrap();
        assert_eq!(key, 0);
        assert_eq!(notice.notice_type, NoticeType::Renewal);

        assert_eq!(
            scheduler.notice_period_label(0).await.unwrap(),
            "One month before renewal/expiration"
        );
        assert_eq!(scheduler.notice_type_label(1).await.unwrap(), "Expiration");

        let renewals = scheduler.list_notices(Some(NoticeType::Renewal)).await.unwrap();
        assert_eq!(renewals.len(), 1);
        assert_eq!(scheduler.list_notices(None).await.unwrap().len(), 2);

        assert_eq!(scheduler.list_periods().len(), 17);
        assert_eq!(scheduler.list_notice_types()[0].1, "Renewal");
    }

    #[tokio::test]
    async fn test_save_and_delete_notice() {
        let fixture = Fixture::new(vec![]);
        let scheduler = fixture.scheduler();

        let key = scheduler
            .save_notice(
                None,
                Notice::new(NoticeType::Expiration, TriggerPeriod::OneWeekAfter, "Lapsed", "Come back"),
            )
            .await
            .unwrap();
        assert_eq!(key, 2);
        assert_eq!(scheduler.list_notices(None).await.unwrap().len(), 3);

        scheduler
            .save_notice(Some(2), Notice::default_expiration())
            .await
            .unwrap();
        let (_, notice) = scheduler.get_notice(2).await.unwrap();
        assert_eq!(notice, Notice::default_expiration());

        scheduler.delete_notice(2).await.unwrap();
        assert!(matches!(
            scheduler.delete_notice(2).await,
            Err(ReminderError::NoticeNotFound(2))
        ));
    }

    #[tokio::test]
    async fn test_labels_are_translated_then_hooked() {
        struct Shout;
        impl Localization for Shout {
            fn translate(&self, text: &str) -> String {
                text.to_uppercase()
            }
        }

        let fixture = Fixture::new(vec![]);
        let scheduler = fixture
            .scheduler()
            .with_localization(Shout)
            .with_hooks(ReminderHooks::new().on_type_label(|label, key| {
                label.push_str(&format!(" #{}", key));
            }));

        assert_eq!(scheduler.notice_type_label(0).await.unwrap(), "RENEWAL #0");
    }

    #[tokio::test]
    async fn test_send_test_notice_writes_no_marker() {
        let fixture = Fixture::new(vec![renewing(1)]);
        let scheduler = fixture.scheduler();

        let rendered = scheduler
            .send_test_notice(0, "ops@example.com")
            .await
            .unwrap();
        assert_eq!(
            rendered.body,
            "Hello NAME GOES HERE,\n\nYour subscription for SUBSCRIPTION NAME will renew on June 1, 2024."
        );
        assert_eq!(fixture.sender.sent_to("ops@example.com").await.len(), 1);
        assert_eq!(
            fixture.subscribers.read_meta(1, "_reminder_sent_10_0").await.unwrap(),
            None
        );
    }
}
