//! Audit entries attached to a member's record.

use chrono::{DateTime, Utc};
use reminders_core::SubscriberId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Where an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntrySource {
    /// Written by a reminder run.
    #[default]
    Reminder,
    /// Written by an operator or an external tool.
    Manual,
}

/// One note in a member's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub subscriber_id: SubscriberId,
    pub source: EntrySource,
    pub note: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl AuditEntry {
    /// A reminder note for `subscriber_id`, stamped now.
    ///
    /// ```
    /// use reminders_audit::AuditEntry;
    ///
    /// let entry = AuditEntry::note(7, "Renewal notice was emailed to the member.");
    /// assert_eq!(entry.subscriber_id, 7);
    /// ```
    pub fn note(subscriber_id: SubscriberId, note: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            subscriber_id,
            source: EntrySource::Reminder,
            note: note.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn source(mut self, source: EntrySource) -> Self {
        self.source = source;
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}
