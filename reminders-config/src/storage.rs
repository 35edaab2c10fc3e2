//! Where the host keeps subscribers, edited notices and the audit trail.

use crate::Result;
use crate::validation::{ConfigValidator, Validate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_SUBSCRIBERS_FILE: &str = "subscribers.json";
pub const DEFAULT_AUDIT_LOG: &str = "reminders-audit.log";
pub const DEFAULT_NOTICES_FILE: &str = "reminder-notices.json";

/// File locations and audit retention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub subscribers_file: PathBuf,
    pub audit_log: PathBuf,
    /// Notices edited from the command line.
    pub notices_file: PathBuf,
    /// Keep audit notes this many days. `None` keeps them forever.
    pub audit_retention_days: Option<u32>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            subscribers_file: PathBuf::from(DEFAULT_SUBSCRIBERS_FILE),
            audit_log: PathBuf::from(DEFAULT_AUDIT_LOG),
            notices_file: PathBuf::from(DEFAULT_NOTICES_FILE),
            audit_retention_days: None,
        }
    }
}

impl StorageConfig {
    /// Lock file guarding the data files, next to the subscriber file.
    pub fn lock_file(&self) -> PathBuf {
        let mut name = self.subscribers_file.clone().into_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }
}

impl Validate for StorageConfig {
    fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.subscribers_file.to_string_lossy(), "subscribers_file")?;
        ConfigValidator::not_empty(&self.audit_log.to_string_lossy(), "audit_log")?;
        ConfigValidator::not_empty(&self.notices_file.to_string_lossy(), "notices_file")?;
        if let Some(days) = self.audit_retention_days {
            ConfigValidator::in_range(days, 1, 36_500, "audit_retention_days")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config: StorageConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config, StorageConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lock_file_sits_next_to_subscribers() {
        let config = StorageConfig {
            subscribers_file: PathBuf::from("/var/lib/reminders/members.json"),
            ..Default::default()
        };
        assert_eq!(
            config.lock_file(),
            PathBuf::from("/var/lib/reminders/members.json.lock")
        );
    }

    #[test]
    fn test_retention_must_be_positive() {
        let config: StorageConfig =
            serde_json::from_value(json!({ "audit_retention_days": 0 })).unwrap();
        assert!(config.validate().is_err());
    }
}
