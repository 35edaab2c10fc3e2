//! Audit logger

use crate::{AuditBackend, AuditBackendError, AuditEntry, FileBackend, MaskingConfig, mask_note};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reminders_core::{AuditLog, SubscriberId};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Records member notes in a backend.
pub struct AuditLogger {
    backend: Arc<dyn AuditBackend>,
    masking: MaskingConfig,
    enabled: bool,
}

impl AuditLogger {
    /// Create a new audit logger builder
    ///
    /// # Examples
    ///
    /// ```
    /// use reminders_audit::*;
    ///
    /// let logger = AuditLogger::builder(MemoryBackend::new())
    ///     .masking(MaskingConfig::disabled())
    ///     .build();
    /// assert!(logger.is_enabled());
    /// ```
    pub fn builder(backend: impl AuditBackend + 'static) -> AuditLoggerBuilder {
        AuditLoggerBuilder::new(Arc::new(backend))
    }

    /// Logger writing JSON lines to `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::builder(FileBackend::new(path)).build()
    }

    /// Store an entry, masking its note first.
    pub async fn log(&self, mut entry: AuditEntry) -> Result<(), AuditBackendError> {
        if !self.enabled {
            return Ok(());
        }

        entry.note = mask_note(&entry.note, &self.masking);
        debug!(subscriber = entry.subscriber_id, id = %entry.id, "Recording audit note");
        self.backend.write(&entry).await
    }

    /// The member's trail, oldest first.
    pub async fn notes_for(&self, id: SubscriberId) -> Result<Vec<AuditEntry>, AuditBackendError> {
        self.backend.read_for(id).await
    }

    /// Delete entries older than `max_age` relative to `now`.
    pub async fn prune(
        &self,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> Result<usize, AuditBackendError> {
        let cutoff = now - max_age;
        let deleted = self.backend.delete_before(cutoff).await?;
        if deleted > 0 {
            info!(deleted, cutoff = %cutoff, "Pruned old audit notes");
        }
        Ok(deleted)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[async_trait]
impl AuditLog for AuditLogger {
    async fn append_note(&self, id: SubscriberId, text: &str) -> reminders_core::Result<()> {
        self.log(AuditEntry::note(id, text)).await?;
        Ok(())
    }
}

/// Audit logger builder
pub struct AuditLoggerBuilder {
    backend: Arc<dyn AuditBackend>,
    masking: MaskingConfig,
    enabled: bool,
}

impl AuditLoggerBuilder {
    pub fn new(backend: Arc<dyn AuditBackend>) -> Self {
        Self {
            backend,
            masking: MaskingConfig::default(),
            enabled: true,
        }
    }

    pub fn masking(mut self, masking: MaskingConfig) -> Self {
        self.masking = masking;
        self
    }

    /// A disabled logger accepts and drops every note.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn build(self) -> AuditLogger {
        AuditLogger {
            backend: self.backend,
            masking: self.masking,
            enabled: self.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBackend;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_append_note_records_entry() {
        let backend = MemoryBackend::new();
        let logger = AuditLogger::builder(backend.clone()).build();

        logger
            .append_note(4, "Renewal notice was emailed to the member.")
            .await
            .unwrap();

        let entries = backend.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].subscriber_id, 4);
        assert_eq!(entries[0].note, "Renewal notice was emailed to the member.");
    }

    #[tokio::test]
    async fn test_notes_are_masked() {
        let backend = MemoryBackend::new();
        let logger = AuditLogger::builder(backend.clone()).build();

        logger.append_note(4, "Sent to sam@example.com").await.unwrap();
        assert_eq!(backend.entries().await[0].note, "Sent to [EMAIL]");
    }

    #[tokio::test]
    async fn test_disabled_logger_drops_notes() {
        let backend = MemoryBackend::new();
        let logger = AuditLogger::builder(backend.clone()).enabled(false).build();

        logger.append_note(4, "ignored").await.unwrap();
        assert!(backend.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_prune_uses_max_age() {
        let backend = MemoryBackend::new();
        let logger = AuditLogger::builder(backend.clone()).build();
        let now = Utc.with_ymd_and_hms(2024, 9, 15, 0, 0, 0).unwrap();

        logger
            .log(AuditEntry::note(1, "old").at(now - Duration::days(100)))
            .await
            .unwrap();
        logger
            .log(AuditEntry::note(1, "recent").at(now - Duration::days(10)))
            .await
            .unwrap();

        assert_eq!(logger.prune(Duration::days(90), now).await.unwrap(), 1);
        assert_eq!(logger.notes_for(1).await.unwrap()[0].note, "recent");
    }
}
