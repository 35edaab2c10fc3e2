//! Settings snapshot loaded once per run.

use crate::catalog::NoticeCatalog;
use crate::error::{ReminderError, Result};
use crate::notice::NoticeType;
use crate::store::{SettingsStore, SettingsStoreExt};
use chrono::{FixedOffset, Offset, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

/// Settings keys read by the engine.
pub mod keys {
    /// Stored notice catalog.
    pub const NOTICES: &str = "reminder_notices";
    /// Name substituted for `%sitename%`.
    pub const SITE_NAME: &str = "site_name";
    /// `strftime` pattern for `%expiration%`.
    pub const DATE_FORMAT: &str = "date_format";
    /// Site offset from UTC, in minutes.
    pub const UTC_OFFSET_MINUTES: &str = "utc_offset_minutes";
}

/// Default `%expiration%` format, e.g. "March 7, 2024".
pub const DEFAULT_DATE_FORMAT: &str = "%B %-d, %Y";

/// Everything a run needs from settings, read up front.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderSettings {
    /// Per-type switch, before policy hooks.
    pub enabled: BTreeMap<NoticeType, bool>,
    pub notices: NoticeCatalog,
    pub site_name: String,
    pub date_format: String,
    pub utc_offset: FixedOffset,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            enabled: NoticeType::ALL.into_iter().map(|t| (t, false)).collect(),
            notices: NoticeCatalog::defaults(),
            site_name: String::new(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            utc_offset: utc(),
        }
    }
}

impl ReminderSettings {
    /// Read a snapshot. Any failure is reported as [`ReminderError::Settings`].
    pub async fn load(store: &dyn SettingsStore) -> Result<Self> {
        let mut enabled = BTreeMap::new();
        for notice_type in NoticeType::ALL {
            let value = store
                .get_option(&notice_type.enabled_key())
                .await
                .map_err(as_settings_error)?;
            enabled.insert(notice_type, is_truthy(value.as_ref()));
        }

        let notices = load_catalog(store).await?;

        let site_name: String = store
            .get_option_or(keys::SITE_NAME, String::new())
            .await
            .map_err(as_settings_error)?;

        let date_format: String = store
            .get_option_or(keys::DATE_FORMAT, DEFAULT_DATE_FORMAT.to_string())
            .await
            .map_err(as_settings_error)?;

        let minutes: i32 = store
            .get_option_or(keys::UTC_OFFSET_MINUTES, 0)
            .await
            .map_err(as_settings_error)?;
        let utc_offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ReminderError::Settings(format!("utc offset out of range: {} minutes", minutes))
            })?;

        Ok(Self {
            enabled,
            notices,
            site_name,
            date_format: if date_format.is_empty() {
                DEFAULT_DATE_FORMAT.to_string()
            } else {
                date_format
            },
            utc_offset,
        })
    }

    /// Whether settings turn a type on, before policy hooks.
    pub fn is_enabled(&self, notice_type: NoticeType) -> bool {
        self.enabled.get(&notice_type).copied().unwrap_or(false)
    }
}

/// Read the stored catalog, seeding the built-in notices when none is stored.
pub async fn load_catalog(store: &dyn SettingsStore) -> Result<NoticeCatalog> {
    let stored = store
        .get_option(keys::NOTICES)
        .await
        .map_err(as_settings_error)?;
    NoticeCatalog::from_stored(stored)
        .map_err(|e| ReminderError::Settings(format!("stored notices are invalid: {}", e)))
}

/// Persist a catalog.
pub async fn save_catalog(store: &dyn SettingsStore, catalog: &NoticeCatalog) -> Result<()> {
    store
        .set_option(keys::NOTICES, catalog.to_value()?)
        .await
        .map_err(as_settings_error)
}

/// Presence of a checkbox-style option. `false`, `0`, `""` and `null` count as off.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !matches!(s.trim().to_lowercase().as_str(), "" | "0" | "false"),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

fn as_settings_error(err: ReminderError) -> ReminderError {
    match err {
        ReminderError::Settings(_) => err,
        other => ReminderError::Settings(other.to_string()),
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}
