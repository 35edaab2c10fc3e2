//! Configuration for membership reminders.
//!
//! [`ConfigManager`] holds options loaded from TOML/JSON/env files, a `.env`
//! file and `REMINDERS_*` environment variables. It is also the
//! [`SettingsStore`] the reminder engine reads its settings from.

pub mod builder;
pub mod delivery;
pub mod env;
pub mod error;
pub mod loader;
pub mod storage;
pub mod validation;

pub use builder::ConfigBuilder;
pub use delivery::{DEFAULT_SCHEDULE, DeliveryConfig};
pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use storage::StorageConfig;
pub use validation::{ConfigValidator, Validate};

use async_trait::async_trait;
use reminders_core::SettingsStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared option map.
#[derive(Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<HashMap<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    /// Create an empty manager reading `REMINDERS_*` variables.
    pub fn new() -> Self {
        Self::with_prefix(env::DEFAULT_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::new(RwLock::new(HashMap::new())),
            env_prefix: Some(prefix.into()),
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Value>> {
        self.config.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Value>> {
        self.config.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Merge prefixed variables from the process environment.
    pub fn load_env(&self) {
        let vars = EnvLoader::new(self.env_prefix.clone()).load();
        self.write().extend(vars);
    }

    /// Merge a configuration file.
    pub fn load_file(&self, path: &Path, format: FileFormat) -> Result<()> {
        let options = ConfigLoader::new(format).load_file(path)?;
        tracing::debug!(path = %path.display(), keys = options.len(), "Loaded configuration file");
        self.write().extend(options);
        Ok(())
    }

    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.write().insert(key.to_string(), value);
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .get_value(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value).map_err(|e| ConfigError::Shape {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// Typed value, or `default` when absent or of the wrong shape.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.read().get(key).cloned()
    }

    pub fn has(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.write().remove(key)
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Copy every option from `other`, overriding existing keys.
    pub fn merge(&self, other: &ConfigManager) {
        let theirs = other.read().clone();
        self.write().extend(theirs);
    }

    /// Deserialize all options into `T` and validate it.
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let object: serde_json::Map<String, Value> = self
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let section: T = serde_json::from_value(Value::Object(object))?;
        section.validate()?;
        Ok(section)
    }

    /// Write every option to a JSON file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let object: std::collections::BTreeMap<String, Value> =
            self.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let content = serde_json::to_string_pretty(&object)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingsStore for ConfigManager {
    async fn get_option(&self, key: &str) -> reminders_core::Result<Option<Value>> {
        Ok(self.get_value(key))
    }

    async fn set_option(&self, key: &str, value: Value) -> reminders_core::Result<()> {
        self.write().insert(key.to_string(), value);
        Ok(())
    }
}
