//! In-memory collaborators.
//!
//! Useful for tests and for small deployments that load subscribers from a file.

use crate::error::{ReminderError, Result};
use crate::query::SubscriberQuery;
use crate::store::{AuditLog, NotificationSender, SettingsStore, SubscriberStore};
use crate::subscriber::{Subscriber, SubscriberId};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Settings held in a map.
#[derive(Clone, Default)]
pub struct MemorySettingsStore {
    options: Arc<RwLock<HashMap<String, serde_json::Value>>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without going through the async trait.
    pub fn with_option(self, key: impl Into<String>, value: serde_json::Value) -> Self {
        if let Ok(mut options) = self.options.try_write() {
            options.insert(key.into(), value);
        }
        self
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get_option(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.options.read().await.get(key).cloned())
    }

    async fn set_option(&self, key: &str, value: serde_json::Value) -> Result<()> {
        self.options.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Subscribers held in a map, queries evaluated in process.
#[derive(Clone, Default)]
pub struct MemorySubscriberStore {
    subscribers: Arc<RwLock<BTreeMap<SubscriberId, Subscriber>>>,
}

impl MemorySubscriberStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a list of subscribers.
    pub fn from_subscribers(subscribers: impl IntoIterator<Item = Subscriber>) -> Self {
        let map = subscribers.into_iter().map(|s| (s.id, s)).collect();
        Self {
            subscribers: Arc::new(RwLock::new(map)),
        }
    }

    /// Add or replace a subscriber.
    pub async fn insert(&self, subscriber: Subscriber) {
        self.subscribers.write().await.insert(subscriber.id, subscriber);
    }

    /// Drop every stored subscriber and hold `subscribers` instead.
    pub async fn replace_all(&self, subscribers: impl IntoIterator<Item = Subscriber>) {
        *self.subscribers.write().await = subscribers.into_iter().map(|s| (s.id, s)).collect();
    }

    /// Copy of every stored subscriber, in id order.
    pub async fn snapshot(&self) -> Vec<Subscriber> {
        self.subscribers.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl SubscriberStore for MemorySubscriberStore {
    async fn query(&self, query: &SubscriberQuery) -> Result<Vec<SubscriberId>> {
        let subscribers = self.subscribers.read().await;
        Ok(subscribers
            .values()
            .filter(|s| query.matches(s))
            .map(|s| s.id)
            .collect())
    }

    async fn get(&self, id: SubscriberId) -> Result<Subscriber> {
        self.subscribers
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ReminderError::SubscriberNotFound(id))
    }

    async fn read_meta(&self, id: SubscriberId, key: &str) -> Result<Option<String>> {
        let subscribers = self.subscribers.read().await;
        let subscriber = subscribers
            .get(&id)
            .ok_or(ReminderError::SubscriberNotFound(id))?;
        Ok(subscriber.meta.get(key).cloned())
    }

    async fn write_meta(&self, id: SubscriberId, key: &str, value: &str) -> Result<()> {
        let mut subscribers = self.subscribers.write().await;
        let subscriber = subscribers
            .get_mut(&id)
            .ok_or(ReminderError::SubscriberNotFound(id))?;
        subscriber.meta.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn insert_meta_if_absent(
        &self,
        id: SubscriberId,
        key: &str,
        value: &str,
    ) -> Result<bool> {
        let mut subscribers = self.subscribers.write().await;
        let subscriber = subscribers
            .get_mut(&id)
            .ok_or(ReminderError::SubscriberNotFound(id))?;

        if subscriber.meta.contains_key(key) {
            return Ok(false);
        }
        subscriber.meta.insert(key.to_string(), value.to_string());
        Ok(true)
    }
}

/// A notification captured by [`MemorySender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Records notifications instead of delivering them.
#[derive(Clone, Default)]
pub struct MemorySender {
    sent: Arc<Mutex<Vec<SentNotification>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl MemorySender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `address` fail.
    pub async fn fail_for(&self, address: impl Into<String>) {
        self.failing.lock().await.insert(address.into());
    }

    /// Let sends to `address` succeed again.
    pub async fn recover(&self, address: &str) {
        self.failing.lock().await.remove(address);
    }

    pub async fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().await.clone()
    }

    /// Notifications delivered to one address.
    pub async fn sent_to(&self, address: &str) -> Vec<SentNotification> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|n| n.to == address)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationSender for MemorySender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        if self.failing.lock().await.contains(to) {
            return Err(ReminderError::Delivery(format!("recipient {} rejected", to)));
        }

        self.sent.lock().await.push(SentNotification {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Audit notes held in a list.
#[derive(Clone, Default)]
pub struct MemoryAuditLog {
    notes: Arc<Mutex<Vec<(SubscriberId, String)>>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn notes(&self) -> Vec<(SubscriberId, String)> {
        self.notes.lock().await.clone()
    }

    pub async fn notes_for(&self, id: SubscriberId) -> Vec<String> {
        self.notes
            .lock()
            .await
            .iter()
            .filter(|(owner, _)| *owner == id)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn append_note(&self, id: SubscriberId, text: &str) -> Result<()> {
        self.notes.lock().await.push((id, text.to_string()));
        Ok(())
    }
}
