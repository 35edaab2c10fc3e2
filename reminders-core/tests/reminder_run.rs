//! End-to-end reminder runs against the in-memory collaborators.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use reminders_core::prelude::*;
use reminders_core::store::SubscriberStore;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 15, 14, 0, 0).unwrap()
}

fn catalog(notices: Vec<Notice>) -> serde_json::Value {
    let catalog: NoticeCatalog = notices
        .into_iter()
        .enumerate()
        .map(|(i, n)| (i as NoticeKey, n))
        .collect();
    catalog.to_value().unwrap()
}

struct Harness {
    settings: MemorySettingsStore,
    subscribers: MemorySubscriberStore,
    sender: MemorySender,
    audit: MemoryAuditLog,
}

impl Harness {
    fn new(notices: Vec<Notice>, subscribers: Vec<Subscriber>) -> Self {
        Self {
            settings: MemorySettingsStore::new()
                .with_option("send_renewal_reminders", json!("1"))
                .with_option("send_expiration_reminders", json!("1"))
                .with_option("reminder_notices", catalog(notices))
                .with_option("site_name", json!("Acme Club")),
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

fn renewal_30() -> Notice {
    Notice::new(
        NoticeType::Renewal,
        TriggerPeriod::OneMonthBefore,
        "Renewing soon at %sitename%",
        "Hi %name%, %subscription_name% renews on %expiration% for $%amount%.",
    )
}

fn expiration_after_7() -> Notice {
    Notice::new(
        NoticeType::Expiration,
        TriggerPeriod::OneWeekAfter,
        "We miss you",
        "Hi %name%, %subscription_name% expired on %expiration%.",
    )
}

#[tokio::test]
async fn test_renewal_scenario_sends_once_and_marks() {
    let s = Subscriber::new(1, "s@example.com", SubscriptionStatus::Active)
        .with_name("Sam", "Stone")
        .subscription(5, "Gold")
        .with_amount(20.0)
        .recurring(true)
        .expires_at(now() + Duration::days(30));
    let harness = Harness::new(vec![renewal_30()], vec![s]);

    let report = harness.scheduler().run().await.unwrap();
    assert_eq!(report.sent, 1);

    let sent = harness.sender.sent_to("s@example.com").await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Renewing soon at Acme Club");
    assert_eq!(
        sent[0].body,
        "Hi Sam, Gold renews on October 15, 2024 for $20.00."
    );

    let marker = harness.subscribers.read_meta(1, "_reminder_sent_5_0").await.unwrap();
    assert_eq!(marker, Some(now().timestamp().to_string()));
}

#[tokio::test]
async fn test_expiration_after_scenario() {
    let t = Subscriber::new(2, "t@example.com", SubscriptionStatus::Expired)
        .with_name("Tess", "")
        .subscription(9, "Silver")
        .expires_at(now() - Duration::days(7));
    let harness = Harness::new(vec![expiration_after_7()], vec![t]);

    let report = harness.scheduler().run().await.unwrap();
    assert_eq!(report.sent, 1);

    let sent = harness.sender.sent_to("t@example.com").await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].body, "Hi Tess, Silver expired on September 8, 2024.");
    assert_eq!(
        harness.audit.notes_for(2).await,
        vec!["Expiration notice was emailed to the member.".to_string()]
    );
}

#[tokio::test]
async fn test_recurring_and_trialing_never_get_expiration_notices() {
    let before_30 = Notice::new(
        NoticeType::Expiration,
        TriggerPeriod::OneMonthBefore,
        "Expiring",
        "Bye %name%",
    );
    let trialing = Subscriber::new(3, "trial@example.com", SubscriptionStatus::Active)
        .trialing(true)
        .expires_at(now() + Duration::days(30));
    let plain = Subscriber::new(4, "plain@example.com", SubscriptionStatus::Active)
        .expires_at(now() + Duration::days(30));
    let harness = Harness::new(vec![before_30], vec![trialing, plain]);

    let report = harness.scheduler().run().await.unwrap();
    assert_eq!(report.sent, 1);
    assert_eq!(report.excluded, 1);
    assert!(harness.sender.sent_to("trial@example.com").await.is_empty());
    assert_eq!(harness.sender.sent_to("plain@example.com").await.len(), 1);
}

/// A store whose query ignores the recurring clause, standing in for a host
/// query that matches more broadly than asked.
struct LooseStore(MemorySubscriberStore);

#[async_trait]
impl SubscriberStore for LooseStore {
    async fn query(&self, _query: &SubscriberQuery) -> Result<Vec<SubscriberId>> {
        Ok(self.0.snapshot().await.into_iter().map(|s| s.id).collect())
    }

    async fn get(&self, id: SubscriberId) -> Result<Subscriber> {
        self.0.get(id).await
    }

    async fn read_meta(&self, id: SubscriberId, key: &str) -> Result<Option<String>> {
        self.0.read_meta(id, key).await
    }

    async fn write_meta(&self, id: SubscriberId, key: &str, value: &str) -> Result<()> {
        self.0.write_meta(id, key, value).await
    }

    async fn insert_meta_if_absent(
        &self,
        id: SubscriberId,
        key: &str,
        value: &str,
    ) -> Result<bool> {
        self.0.insert_meta_if_absent(id, key, value).await
    }
}

#[tokio::test]
async fn test_recurring_excluded_even_when_query_matches() {
    let u = Subscriber::new(5, "u@example.com", SubscriptionStatus::Expired)
        .recurring(true)
        .expires_at(now() - Duration::days(7));
    let harness = Harness::new(vec![expiration_after_7()], vec![u]);

    let scheduler = ReminderScheduler::new(
        Arc::new(harness.settings.clone()),
        Arc::new(LooseStore(harness.subscribers.clone())),
        Arc::new(harness.sender.clone()),
        Arc::new(harness.audit.clone()),
    )
    .with_clock(FixedClock(now()));

    let report = scheduler.run().await.unwrap();
    assert_eq!(report.sent, 0);
    assert_eq!(report.excluded, 1);
    assert!(harness.sender.sent().await.is_empty());
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let s = Subscriber::new(1, "s@example.com", SubscriptionStatus::Active)
        .subscription(5, "Gold")
        .recurring(true)
        .expires_at(now() + Duration::days(30));
    let harness = Harness::new(vec![renewal_30()], vec![s]);
    let scheduler = harness.scheduler();

    assert_eq!(scheduler.run().await.unwrap().sent, 1);

    let second = scheduler.run().await.unwrap();
    assert_eq!(second.sent, 0);
    assert_eq!(second.already_notified, 1);
    assert_eq!(harness.sender.sent().await.len(), 1);
}

#[tokio::test]
async fn test_new_subscription_cycle_is_notified_again() {
    let s = Subscriber::new(1, "s@example.com", SubscriptionStatus::Active)
        .subscription(5, "Gold")
        .recurring(true)
        .expires_at(now() + Duration::days(30));
    let harness = Harness::new(vec![renewal_30()], vec![s.clone()]);
    let scheduler = harness.scheduler();

    scheduler.run().await.unwrap();

    // Renewal assigns a new subscription id; the old marker no longer applies.
    let mut renewed = harness.subscribers.get(1).await.unwrap();
    renewed.subscription_id = Some(6);
    harness.subscribers.insert(renewed).await;

    assert_eq!(scheduler.run().await.unwrap().sent, 1);
    assert_eq!(harness.sender.sent().await.len(), 2);
}

#[tokio::test]
async fn test_incomplete_notices_never_dispatch() {
    let mut no_subject = renewal_30();
    no_subject.subject.clear();
    let mut no_body = renewal_30();
    no_body.message.clear();

    let s = Subscriber::new(1, "s@example.com", SubscriptionStatus::Active)
        .recurring(true)
        .expires_at(now() + Duration::days(30));
    let harness = Harness::new(vec![no_subject, no_body], vec![s]);

    let report = harness.scheduler().run().await.unwrap();
    assert_eq!(report.incomplete_notices, 2);
    assert!(harness.sender.sent().await.is_empty());
}

#[tokio::test]
async fn test_delivery_failure_is_isolated_and_retried_next_run() {
    let bad = Subscriber::new(1, "bad@example.com", SubscriptionStatus::Active)
        .subscription(1, "Gold")
        .recurring(true)
        .expires_at(now() + Duration::days(30));
    let good = Subscriber::new(2, "good@example.com", SubscriptionStatus::Active)
        .subscription(2, "Gold")
        .recurring(true)
        .expires_at(now() + Duration::days(30));
    let harness = Harness::new(vec![renewal_30()], vec![bad, good]);
    harness.sender.fail_for("bad@example.com").await;
    let scheduler = harness.scheduler();

    let report = scheduler.run().await.unwrap();
    assert_eq!(report.sent, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(
        harness.subscribers.read_meta(1, "_reminder_sent_1_0").await.unwrap(),
        None
    );

    harness.sender.recover("bad@example.com").await;
    let report = scheduler.run().await.unwrap();
    assert_eq!(report.sent, 1);
    assert_eq!(report.already_notified, 1);
    assert_eq!(harness.sender.sent_to("bad@example.com").await.len(), 1);
}

#[tokio::test]
async fn test_cleared_marker_is_resent_and_rewritten() {
    let mut s = Subscriber::new(1, "s@example.com", SubscriptionStatus::Active)
        .subscription(5, "Gold")
        .recurring(true)
        .expires_at(now() + Duration::days(30));
    s.meta.insert("_reminder_sent_5_0".to_string(), "0".to_string());
    let harness = Harness::new(vec![renewal_30()], vec![s]);

    assert_eq!(harness.scheduler().run().await.unwrap().sent, 1);
    assert_eq!(
        harness.subscribers.read_meta(1, "_reminder_sent_5_0").await.unwrap(),
        Some(now().timestamp().to_string())
    );
}

/// Subscriber store that can be switched off.
struct FlakyStore {
    inner: MemorySubscriberStore,
    down: AtomicBool,
}

#[async_trait]
impl SubscriberStore for FlakyStore {
    async fn query(&self, query: &SubscriberQuery) -> Result<Vec<SubscriberId>> {
        if self.down.load(Ordering::SeqCst) {
            return Err(ReminderError::StoreUnavailable("connection refused".to_string()));
        }
        self.inner.query(query).await
    }

    async fn get(&self, id: SubscriberId) -> Result<Subscriber> {
        self.inner.get(id).await
    }

    async fn read_meta(&self, id: SubscriberId, key: &str) -> Result<Option<String>> {
        self.inner.read_meta(id, key).await
    }

    async fn write_meta(&self, id: SubscriberId, key: &str, value: &str) -> Result<()> {
        self.inner.write_meta(id, key, value).await
    }

    async fn insert_meta_if_absent(
        &self,
        id: SubscriberId,
        key: &str,
        value: &str,
    ) -> Result<bool> {
        self.inner.insert_meta_if_absent(id, key, value).await
    }
}

#[tokio::test]
async fn test_unavailable_store_aborts_run() {
    let harness = Harness::new(vec![renewal_30()], vec![]);
    let store = FlakyStore {
        inner: harness.subscribers.clone(),
        down: AtomicBool::new(true),
    };

    let scheduler = ReminderScheduler::new(
        Arc::new(harness.settings.clone()),
        Arc::new(store),
        Arc::new(harness.sender.clone()),
        Arc::new(harness.audit.clone()),
    );

    let err = scheduler.run().await.unwrap_err();
    assert!(matches!(err, ReminderError::StoreUnavailable(_)));
}

#[tokio::test]
async fn test_missing_subscriber_is_skipped_not_fatal() {
    let s = Subscriber::new(1, "s@example.com", SubscriptionStatus::Active)
        .recurring(true)
        .expires_at(now() + Duration::days(30));
    let harness = Harness::new(vec![renewal_30()], vec![s]);

    /// Query finds a subscriber the store can no longer load.
    struct GhostStore(MemorySubscriberStore);

    #[async_trait]
    impl SubscriberStore for GhostStore {
        async fn query(&self, query: &SubscriberQuery) -> Result<Vec<SubscriberId>> {
            let mut ids = self.0.query(query).await?;
            ids.insert(0, 99);
            Ok(ids)
        }
        async fn get(&self, id: SubscriberId) -> Result<Subscriber> {
            self.0.get(id).await
        }
        async fn read_meta(&self, id: SubscriberId, key: &str) -> Result<Option<String>> {
            self.0.read_meta(id, key).await
        }
        async fn write_meta(&self, id: SubscriberId, key: &str, value: &str) -> Result<()> {
            self.0.write_meta(id, key, value).await
        }
        async fn insert_meta_if_absent(
            &self,
            id: SubscriberId,
            key: &str,
            value: &str,
        ) -> Result<bool> {
            self.0.insert_meta_if_absent(id, key, value).await
        }
    }

    let scheduler = ReminderScheduler::new(
        Arc::new(harness.settings.clone()),
        Arc::new(GhostStore(harness.subscribers.clone())),
        Arc::new(harness.sender.clone()),
        Arc::new(harness.audit.clone()),
    )
    .with_clock(FixedClock(now()));

    let report = scheduler.run().await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.sent, 1);
}

#[tokio::test]
async fn test_invalid_settings_abort_run() {
    let harness = Harness::new(vec![], vec![]);
    harness
        .settings
        .set_option("utc_offset_minutes", json!("not a number"))
        .await
        .unwrap();

    let err = harness.scheduler().run().await.unwrap_err();
    assert!(matches!(err, ReminderError::Settings(_)));
}

#[tokio::test]
async fn test_query_hook_narrows_recipients() {
    let opted_out = Subscriber::new(1, "quiet@example.com", SubscriptionStatus::Active)
        .recurring(true)
        .expires_at(now() + Duration::days(30));
    let regular = Subscriber::new(2, "loud@example.com", SubscriptionStatus::Active)
        .recurring(true)
        .expires_at(now() + Duration::days(30));
    let harness = Harness::new(vec![renewal_30()], vec![opted_out, regular]);
    harness
        .subscribers
        .write_meta(1, "no_reminders", "1")
        .await
        .unwrap();

    let hooks = ReminderHooks::new().on_query(|query, _, _| {
        query.push(Clause::meta("no_reminders", MetaCompare::NotExists, None));
    });
    let report = harness.scheduler().with_hooks(hooks).run().await.unwrap();

    assert_eq!(report.sent, 1);
    assert!(harness.sender.sent_to("quiet@example.com").await.is_empty());
}

#[tokio::test]
async fn test_test_notice_falls_back_to_default_message() {
    let empty = Notice::new(NoticeType::Renewal, TriggerPeriod::Today, "", "");
    let harness = Harness::new(vec![empty], vec![]);

    let rendered = harness
        .scheduler()
        .send_test_notice(0, "ops@example.com")
        .await
        .unwrap();

    assert_eq!(
        rendered.subject,
        "Default Subject Message - Your Subscription is About to Renew or Expire"
    );
    assert!(
        rendered
            .body
            .contains("THIS IS A DEFAULT TEST MESSAGE - Notice message was not retrieved.")
    );
    assert!(rendered.body.contains("September 15, 2024"));
    assert_eq!(harness.sender.sent_to("ops@example.com").await.len(), 1);
}
