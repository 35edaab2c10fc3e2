//! Audit logger wired into a reminder run.

use chrono::{Duration, TimeZone, Utc};
use reminders_audit::{AuditLogger, FileBackend};
use reminders_core::prelude::*;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_run_leaves_note_in_file_trail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let now = Utc.with_ymd_and_hms(2024, 9, 15, 14, 0, 0).unwrap();

    let catalog: NoticeCatalog = [(
        0,
        Notice::new(
            NoticeType::Expiration,
            TriggerPeriod::OneDayAfter,
            "Expired",
            "Your %subscription_name% membership has expired.",
        ),
    )]
    .into_iter()
    .collect();
    let settings = MemorySettingsStore::new()
        .with_option("send_expiration_reminders", json!("1"))
        .with_option("reminder_notices", catalog.to_value().unwrap());

    let member = Subscriber::new(8, "lee@example.com", SubscriptionStatus::Expired)
        .subscription(2, "Basic")
        .expires_at(now - Duration::days(1));

    let audit = Arc::new(AuditLogger::builder(FileBackend::new(&path)).build());
    let scheduler = ReminderScheduler::new(
        Arc::new(settings),
        Arc::new(MemorySubscriberStore::from_subscribers(vec![member])),
        Arc::new(MemorySender::new()),
        audit.clone(),
    )
    .with_clock(FixedClock(now));

    let report = scheduler.run().await.unwrap();
    assert_eq!(report.sent, 1);

    let trail = audit.notes_for(8).await.unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].note, "Expiration notice was emailed to the member.");

    let raw = std::fs::read_to_string(&path).unwrap();
    assert_eq!(raw.lines().count(), 1);
}
