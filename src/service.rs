//! Wiring of configuration, storage, mail and audit around the scheduler.

use crate::error::{AppError, AppResult};
use crate::lock::StorageLock;
use crate::subscribers::JsonSubscriberStore;
use chrono::{Duration, FixedOffset};
use reminders_audit::{AuditEntry, AuditLogger};
use reminders_config::{ConfigManager, DeliveryConfig, StorageConfig};
use reminders_core::prelude::*;
use reminders_core::settings::keys;
use reminders_cron::{CronError, CronScheduler, SchedulerConfig};
use reminders_mail::{Mailer, MailerConfig, SmtpConfig};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const JOB_NAME: &str = "reminders";

/// Everything one process needs to send reminders.
pub struct ReminderService {
    config: ConfigManager,
    delivery: DeliveryConfig,
    storage: StorageConfig,
    subscribers: JsonSubscriberStore,
    sender: Arc<dyn NotificationSender>,
    audit: Arc<AuditLogger>,
    clock: Arc<dyn Clock>,
    scheduler: ReminderScheduler,
}

impl ReminderService {
    /// Open the service, delivering through SMTP when a host is configured and
    /// to the log otherwise.
    pub async fn open(config: ConfigManager) -> AppResult<Self> {
        let delivery: DeliveryConfig = config.load_validated()?;
        let mailer = build_mailer(&delivery)?;
        Self::with_sender(config, Arc::new(mailer)).await
    }

    /// Open the service with a caller-supplied sender.
    pub async fn with_sender(
        config: ConfigManager,
        sender: Arc<dyn NotificationSender>,
    ) -> AppResult<Self> {
        let delivery: DeliveryConfig = config.load_validated()?;
        let storage: StorageConfig = config.load_validated()?;

        load_saved_notices(&config, &storage).await?;
        let subscribers = JsonSubscriberStore::load(&storage.subscribers_file).await?;
        let audit = Arc::new(AuditLogger::file(&storage.audit_log));

        let scheduler = ReminderScheduler::new(
            Arc::new(config.clone()),
            Arc::new(subscribers.clone()),
            sender.clone(),
            audit.clone(),
        );

        Ok(Self {
            config,
            delivery,
            storage,
            subscribers,
            sender,
            audit,
            clock: Arc::new(SystemClock),
            scheduler,
        })
    }

    /// Pin "now" for the scheduler and audit retention.
    pub fn with_clock<C: Clock + Clone + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock.clone());
        self.scheduler = self.scheduler.with_clock(clock);
        self
    }

    pub fn with_hooks(mut self, hooks: ReminderHooks) -> Self {
        self.scheduler = self.scheduler.with_hooks(hooks);
        self
    }

    pub fn scheduler(&self) -> &ReminderScheduler {
        &self.scheduler
    }

    pub fn delivery(&self) -> &DeliveryConfig {
        &self.delivery
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    pub fn subscribers(&self) -> &JsonSubscriberStore {
        &self.subscribers
    }

    pub fn utc_offset(&self) -> AppResult<FixedOffset> {
        self.delivery
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                AppError::InvalidArgument(format!(
                    "utc_offset_minutes out of range: {}",
                    self.delivery.utc_offset_minutes
                ))
            })
    }

    /// Whether the notification channel is reachable.
    pub async fn check_delivery(&self) -> bool {
        self.sender.is_healthy().await
    }

    /// One dispatch cycle against the current subscriber and notice files.
    ///
    /// The storage lock is held from reload to write-back, so runs in other
    /// processes wait. Sent markers are written back even when the run aborts
    /// part way.
    pub async fn run_once(&self) -> AppResult<RunReport> {
        let _lock = StorageLock::acquire(self.storage.lock_file()).await?;
        load_saved_notices(&self.config, &self.storage).await?;
        self.subscribers.reload().await?;

        let result = self.scheduler.run().await;

        if let Err(e) = self.subscribers.persist().await {
            error!(error = %e, "Sent markers could not be saved");
            return Err(e);
        }
        let report = result?;

        if let Some(days) = self.storage.audit_retention_days
            && let Err(e) = self
                .audit
                .prune(Duration::days(i64::from(days)), self.clock.now())
                .await
        {
            warn!(error = %e, "Audit retention failed");
        }

        info!(
            path = %self.subscribers.path().display(),
            sent = report.sent,
            "Sent markers saved"
        );
        Ok(report)
    }

    pub async fn send_test(&self, key: NoticeKey, to: &str) -> AppResult<RenderedNotice> {
        load_saved_notices(&self.config, &self.storage).await?;
        Ok(self.scheduler.send_test_notice(key, to).await?)
    }

    /// Store a notice and write the catalog to the notices file.
    pub async fn save_notice(&self, key: Option<NoticeKey>, notice: Notice) -> AppResult<NoticeKey> {
        let _lock = StorageLock::acquire(self.storage.lock_file()).await?;
        load_saved_notices(&self.config, &self.storage).await?;

        let key = self.scheduler.save_notice(key, notice).await?;
        self.write_notices().await?;
        Ok(key)
    }

    pub async fn delete_notice(&self, key: NoticeKey) -> AppResult<Notice> {
        let _lock = StorageLock::acquire(self.storage.lock_file()).await?;
        load_saved_notices(&self.config, &self.storage).await?;

        let notice = self.scheduler.delete_notice(key).await?;
        self.write_notices().await?;
        Ok(notice)
    }

    /// Notices as currently saved, optionally of one type.
    pub async fn notices(&self, filter: Option<NoticeType>) -> AppResult<NoticeCatalog> {
        load_saved_notices(&self.config, &self.storage).await?;
        Ok(self.scheduler.list_notices(filter).await?)
    }

    pub async fn audit_trail(&self, id: SubscriberId) -> AppResult<Vec<AuditEntry>> {
        Ok(self.audit.notes_for(id).await?)
    }

    async fn write_notices(&self) -> AppResult<()> {
        let catalog = self
            .config
            .get_value(keys::NOTICES)
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()));
        let json = serde_json::to_string_pretty(&catalog)
            .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

        let path = &self.storage.notices_file;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| AppError::storage(&tmp, e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| AppError::storage(path, e))?;
        Ok(())
    }
}

/// Notices saved by earlier edits, in this process or another, replace the
/// configured catalog.
async fn load_saved_notices(config: &ConfigManager, storage: &StorageConfig) -> AppResult<()> {
    let raw = match tokio::fs::read_to_string(&storage.notices_file).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(AppError::storage(&storage.notices_file, e)),
    };

    let catalog: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| AppError::storage(&storage.notices_file, e))?;
    config.set(keys::NOTICES, catalog)?;
    Ok(())
}

fn build_mailer(delivery: &DeliveryConfig) -> AppResult<Mailer> {
    let mailer = match &delivery.smtp_host {
        Some(host) => {
            let mut smtp = SmtpConfig::new(host.clone()).port(delivery.smtp_port);
            if let (Some(user), Some(pass)) = (&delivery.smtp_username, &delivery.smtp_password) {
                smtp = smtp.credentials(user.clone(), pass.clone());
            }
            Mailer::smtp(smtp)?
        }
        None => {
            warn!("No smtp_host configured, reminders will only be logged");
            Mailer::log_only()
        }
    };

    let mut config = MailerConfig::default().from(&delivery.from_address)?;
    if let Some(reply_to) = &delivery.reply_to {
        config = config.reply_to(reply_to)?;
    }
    Ok(mailer.with_config(config))
}

/// Fire [`ReminderService::run_once`] on the configured schedule until
/// `shutdown` resolves.
pub async fn run_daemon(
    service: Arc<ReminderService>,
    shutdown: impl Future<Output = ()>,
) -> AppResult<()> {
    let mut cron = CronScheduler::with_config(SchedulerConfig {
        utc_offset: service.utc_offset()?,
        ..Default::default()
    });

    if !service.check_delivery().await {
        warn!("Mail transport is not reachable, runs will fail until it recovers");
    }

    let job_service = service.clone();
    cron.add_job(JOB_NAME, &service.delivery().schedule, move |ctx| {
        let service = job_service.clone();
        async move {
            info!(execution = ctx.execution_count, "Scheduled reminder run");
            service
                .run_once()
                .await
                .map(|_| ())
                .map_err(CronError::execution)
        }
    })
    .await?;

    let stats = cron.get_stats(JOB_NAME).await?;
    info!(
        schedule = %service.delivery().schedule,
        next_run = ?stats.next_run,
        "Reminder daemon started"
    );

    cron.start().await?;
    shutdown.await;
    cron.stop().await?;
    Ok(())
}
