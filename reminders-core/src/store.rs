//! Collaborator traits the reminder engine is built against.

use crate::error::{ReminderError, Result};
use crate::query::SubscriberQuery;
use crate::subscriber::{Subscriber, SubscriberId};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Key-value settings storage.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read an option. `None` when it was never stored.
    async fn get_option(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Store an option, replacing any previous value.
    async fn set_option(&self, key: &str, value: serde_json::Value) -> Result<()>;
}

/// Typed helpers over [`SettingsStore`].
#[async_trait]
pub trait SettingsStoreExt: SettingsStore {
    /// Read an option, falling back to `default` when absent.
    async fn get_option_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        match self.get_option(key).await? {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                ReminderError::Settings(format!("option '{}' has unexpected shape: {}", key, e))
            }),
            None => Ok(default),
        }
    }
}

impl<S: SettingsStore + ?Sized> SettingsStoreExt for S {}

/// Subscriber storage.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Ids of every subscriber matching the query.
    async fn query(&self, query: &SubscriberQuery) -> Result<Vec<SubscriberId>>;

    /// Load one subscriber.
    async fn get(&self, id: SubscriberId) -> Result<Subscriber>;

    /// Read one metadata value.
    async fn read_meta(&self, id: SubscriberId, key: &str) -> Result<Option<String>>;

    /// Write one metadata value, replacing any previous value.
    async fn write_meta(&self, id: SubscriberId, key: &str, value: &str) -> Result<()>;

    /// Write a metadata value only when the key is absent.
    ///
    /// Returns `true` when this call created the value.
    async fn insert_meta_if_absent(&self, id: SubscriberId, key: &str, value: &str)
    -> Result<bool>;
}

/// Outbound notification channel.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;

    /// Whether the channel can take messages right now.
    async fn is_healthy(&self) -> bool {
        true
    }
}

/// Per-subscriber audit trail.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append_note(&self, id: SubscriberId, text: &str) -> Result<()>;
}

/// Label translation. Presentation only.
pub trait Localization: Send + Sync {
    fn translate(&self, text: &str) -> String;
}

/// Returns every label unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTranslation;

impl Localization for NoTranslation {
    fn translate(&self, text: &str) -> String {
        text.to_string()
    }
}
