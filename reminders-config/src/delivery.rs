//! Typed view of the delivery and scheduling options.

use crate::validation::{ConfigValidator, Validate};
use crate::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Daily at midnight, in the six-field cron syntax.
pub const DEFAULT_SCHEDULE: &str = "0 0 0 * * *";

/// Options the host needs to send mail and fire runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub from_address: String,
    /// Where member replies go, when not to `from_address`.
    pub reply_to: Option<String>,
    /// No SMTP host means mail is only logged.
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    #[serde(deserialize_with = "lenient_string")]
    pub smtp_username: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub smtp_password: Option<String>,
    pub schedule: String,
    pub utc_offset_minutes: i32,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            from_address: String::new(),
            reply_to: None,
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            schedule: DEFAULT_SCHEDULE.to_string(),
            utc_offset_minutes: 0,
        }
    }
}

/// Environment values that look numeric arrive as numbers; credentials are
/// still strings.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl Validate for DeliveryConfig {
    fn validate(&self) -> Result<()> {
        ConfigValidator::is_email(&self.from_address, "from_address")?;
        if let Some(reply_to) = &self.reply_to {
            ConfigValidator::is_email(reply_to, "reply_to")?;
        }
        ConfigValidator::is_port(self.smtp_port, "smtp_port")?;
        ConfigValidator::not_empty(&self.schedule, "schedule")?;
        ConfigValidator::in_range(self.utc_offset_minutes, -720, 840, "utc_offset_minutes")?;

        if let Some(host) = &self.smtp_host {
            ConfigValidator::not_empty(host, "smtp_host")?;
        }
        if self.smtp_username.is_some() != self.smtp_password.is_some() {
            return Err(crate::ConfigError::validation(
                "smtp_username",
                "username and password must be set together",
            ));
        }
        Ok(())
    }
}
