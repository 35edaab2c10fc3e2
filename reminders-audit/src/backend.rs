//! Audit trail storage backends

use crate::AuditEntry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reminders_core::SubscriberId;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

/// Audit trail storage backend trait
#[async_trait]
pub trait AuditBackend: Send + Sync {
    /// Append an entry
    async fn write(&self, entry: &AuditEntry) -> Result<(), AuditBackendError>;

    /// Entries for one member, oldest first
    async fn read_for(&self, id: SubscriberId) -> Result<Vec<AuditEntry>, AuditBackendError>;

    /// Drop entries older than `cutoff`, returning how many went
    async fn delete_before(&self, _cutoff: DateTime<Utc>) -> Result<usize, AuditBackendError> {
        Err(AuditBackendError::NotSupported)
    }
}

/// Audit backend errors
#[derive(Debug, thiserror::Error)]
pub enum AuditBackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt audit line {line} in {path}: {message}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Operation not supported")]
    NotSupported,
}

impl From<AuditBackendError> for reminders_core::ReminderError {
    fn from(err: AuditBackendError) -> Self {
        reminders_core::ReminderError::Audit(err.to_string())
    }
}

/// Appends entries to a file, one JSON object per line.
pub struct FileBackend {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_lines(&self) -> Result<String, AuditBackendError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Parse one stored line. Corrupt lines are logged and yield `None`.
    fn parse_line(&self, index: usize, line: &str) -> Option<AuditEntry> {
        match AuditEntry::from_json(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                let err = AuditBackendError::Corrupt {
                    path: self.path.clone(),
                    line: index + 1,
                    message: e.to_string(),
                };
                warn!(error = %err, "Skipping unreadable audit line");
                None
            }
        }
    }

    /// Replace the file through a temporary sibling and a rename.
    async fn replace(&self, contents: String) -> Result<(), AuditBackendError> {
        let tmp = self.path.with_extension("log.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl AuditBackend for FileBackend {
    async fn write(&self, entry: &AuditEntry) -> Result<(), AuditBackendError> {
        let mut line = entry.to_json()?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    async fn read_for(&self, id: SubscriberId) -> Result<Vec<AuditEntry>, AuditBackendError> {
        let _guard = self.lock.lock().await;
        let contents = self.read_lines().await?;

        Ok(contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(i, line)| self.parse_line(i, line))
            .filter(|e| e.subscriber_id == id)
            .collect())
    }

    /// Unreadable lines are kept as they are.
    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<usize, AuditBackendError> {
        let _guard = self.lock.lock().await;
        let contents = self.read_lines().await?;

        let mut kept = String::with_capacity(contents.len());
        let mut removed = 0;
        for (i, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(entry) = self.parse_line(i, line)
                && entry.timestamp < cutoff
            {
                removed += 1;
                continue;
            }
            kept.push_str(line);
            kept.push('\n');
        }

        if removed > 0 {
            self.replace(kept).await?;
        }
        Ok(removed)
    }
}

/// Memory backend for tests
#[derive(Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl AuditBackend for MemoryBackend {
    async fn write(&self, entry: &AuditEntry) -> Result<(), AuditBackendError> {
        self.entries.lock().await.push(entry.clone());
        Ok(())
    }

    async fn read_for(&self, id: SubscriberId) -> Result<Vec<AuditEntry>, AuditBackendError> {
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .filter(|e| e.subscriber_id == id)
            .cloned()
            .collect())
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<usize, AuditBackendError> {
        let mut entries = self.entries.lock().await;
        let original_len = entries.len();
        entries.retain(|e| e.timestamp >= cutoff);
        Ok(original_len - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, day, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_memory_backend_filters_by_member() {
        let backend = MemoryBackend::new();
        backend.write(&AuditEntry::note(1, "a")).await.unwrap();
        backend.write(&AuditEntry::note(2, "b")).await.unwrap();
        backend.write(&AuditEntry::note(1, "c")).await.unwrap();

        let notes: Vec<_> = backend
            .read_for(1)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.note)
            .collect();
        assert_eq!(notes, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_memory_backend_delete_before() {
        let backend = MemoryBackend::new();
        backend.write(&AuditEntry::note(1, "old").at(at(1))).await.unwrap();
        backend.write(&AuditEntry::note(1, "new").at(at(20))).await.unwrap();

        let deleted = backend.delete_before(at(10)).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(backend.entries().await[0].note, "new");
    }

    #[tokio::test]
    async fn test_file_backend_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("audit.log"));

        backend.write(&AuditEntry::note(1, "first")).await.unwrap();
        backend.write(&AuditEntry::note(1, "second")).await.unwrap();

        let raw = tokio::fs::read_to_string(backend.path()).await.unwrap();
        assert_eq!(raw.lines().count(), 2);

        let entries = backend.read_for(1).await.unwrap();
        assert_eq!(entries[1].note, "second");
    }

    #[tokio::test]
    async fn test_file_backend_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("none.log"));
        assert!(backend.read_for(1).await.unwrap().is_empty());
        assert_eq!(backend.delete_before(at(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_file_backend_delete_before_rewrites() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("audit.log"));
        backend.write(&AuditEntry::note(1, "old").at(at(1))).await.unwrap();
        backend
            .write(&AuditEntry::note(2, "new").at(at(1) + Duration::days(30)))
            .await
            .unwrap();

        assert_eq!(backend.delete_before(at(15)).await.unwrap(), 1);
        assert!(backend.read_for(1).await.unwrap().is_empty());
        assert_eq!(backend.read_for(2).await.unwrap().len(), 1);
    }

    async fn write_with_corrupt_line(path: &Path) {
        let old = AuditEntry::note(1, "old").at(at(1)).to_json().unwrap();
        let new = AuditEntry::note(1, "new").at(at(20)).to_json().unwrap();
        tokio::fs::write(path, format!("{}\n{{not json}}\n{}\n", old, new))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_file_backend_skips_corrupt_line_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        write_with_corrupt_line(&path).await;

        let notes: Vec<_> = FileBackend::new(&path)
            .read_for(1)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.note)
            .collect();
        assert_eq!(notes, vec!["old", "new"]);
    }

    #[tokio::test]
    async fn test_file_backend_prune_keeps_corrupt_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        write_with_corrupt_line(&path).await;
        let backend = FileBackend::new(&path);

        assert_eq!(backend.delete_before(at(10)).await.unwrap(), 1);

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<_> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "{not json}");
        assert_eq!(backend.read_for(1).await.unwrap()[0].note, "new");
        assert!(!path.with_extension("log.tmp").exists());
    }
}
