//! Subscribers kept in a JSON file.

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use reminders_core::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A JSON array of subscribers loaded into memory.
///
/// Call [`reload`] before each run so edits made by other processes are seen.
/// Sent markers written during a run live in memory until [`persist`] writes
/// the file back.
///
/// [`reload`]: JsonSubscriberStore::reload
/// [`persist`]: JsonSubscriberStore::persist
#[derive(Clone)]
pub struct JsonSubscriberStore {
    path: PathBuf,
    inner: MemorySubscriberStore,
}

impl JsonSubscriberStore {
    /// Load `path`. A missing file is an empty store.
    pub async fn load(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let subscribers = read_file(&path).await?;

        info!(path = %path.display(), count = subscribers.len(), "Loaded subscribers");
        Ok(Self {
            path,
            inner: MemorySubscriberStore::from_subscribers(subscribers),
        })
    }

    /// Replace the in-memory subscribers with the file's current contents.
    /// On error the previous contents are kept.
    pub async fn reload(&self) -> AppResult<()> {
        let subscribers = read_file(&self.path).await?;
        debug!(path = %self.path.display(), count = subscribers.len(), "Reloaded subscribers");
        self.inner.replace_all(subscribers).await;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write every subscriber back, replacing the file atomically.
    pub async fn persist(&self) -> AppResult<()> {
        let subscribers = self.inner.snapshot().await;
        let json = serde_json::to_string_pretty(&subscribers)
            .map_err(|e| AppError::storage(&self.path, e))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| AppError::storage(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| AppError::storage(&self.path, e))?;

        debug!(path = %self.path.display(), count = subscribers.len(), "Saved subscribers");
        Ok(())
    }

    pub async fn snapshot(&self) -> Vec<Subscriber> {
        self.inner.snapshot().await
    }
}

async fn read_file(path: &Path) -> AppResult<Vec<Subscriber>> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) if raw.trim().is_empty() => Ok(Vec::new()),
        Ok(raw) => serde_json::from_str(&raw).map_err(|e| AppError::storage(path, e)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No subscriber file, starting empty");
            Ok(Vec::new())
        }
        Err(e) => Err(AppError::storage(path, e)),
    }
}

#[async_trait]
impl SubscriberStore for JsonSubscriberStore {
    async fn query(&self, query: &SubscriberQuery) -> Result<Vec<SubscriberId>> {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSubscriberStore::load(dir.path().join("none.json"))
            .await
            .unwrap();
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_markers_survive_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subscribers.json");
        let subscribers = vec![Subscriber::new(1, "a@example.com", SubscriptionStatus::Active)];
        tokio::fs::write(&path, serde_json::to_string(&subscribers).unwrap())
            .await
            .unwrap();

        let store = JsonSubscriberStore::load(&path).await.unwrap();
        store.write_meta(1, "_reminder_sent_2_0", "1726408800").await.unwrap();
        store.persist().await.unwrap();

        let reloaded = JsonSubscriberStore::load(&path).await.unwrap();
        assert_eq!(
            reloaded.read_meta(1, "_reminder_sent_2_0").await.unwrap(),
            Some("1726408800".to_string())
        );
    }

    #[tokio::test]
    async fn test_reload_picks_up_outside_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subscribers.json");
        let first = vec![Subscriber::new(1, "a@example.com", SubscriptionStatus::Active)];
        tokio::fs::write(&path, serde_json::to_string(&first).unwrap())
            .await
            .unwrap();
        let store = JsonSubscriberStore::load(&path).await.unwrap();

        let edited = vec![
            Subscriber::new(1, "a@example.com", SubscriptionStatus::Active),
            Subscriber::new(2, "b@example.com", SubscriptionStatus::Active),
        ];
        tokio::fs::write(&path, serde_json::to_string(&edited).unwrap())
            .await
            .unwrap();
        store.reload().await.unwrap();

        assert_eq!(store.snapshot().await.len(), 2);
        assert_eq!(store.get(2).await.unwrap().email, "b@example.com");
    }

    #[tokio::test]
    async fn test_malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subscribers.json");
        tokio::fs::write(&path, "{").await.unwrap();

        let result = JsonSubscriberStore::load(&path).await;
        assert!(matches!(result, Err(AppError::Storage { .. })));
    }
}
