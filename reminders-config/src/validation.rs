//! Configuration validation.

use crate::{ConfigError, Result};
use std::fmt::Display;

/// Implemented by typed configuration sections.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Field-level checks.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::validation(field, "cannot be empty"));
        }
        Ok(())
    }

    /// Inclusive range check.
    pub fn in_range<T: PartialOrd + Display>(value: T, min: T, max: T, field: &str) -> Result<()> {
        if value < min || value > max {
            return Err(ConfigError::validation(
                field,
                format!("{} is outside {}..={}", value, min, max),
            ));
        }
        Ok(())
    }

    pub fn one_of<T: PartialEq + Display>(value: &T, allowed: &[T], field: &str) -> Result<()> {
        if !allowed.contains(value) {
            let allowed: Vec<String> = allowed.iter().map(|a| a.to_string()).collect();
            return Err(ConfigError::validation(
                field,
                format!("'{}' is not one of: {}", value, allowed.join(", ")),
            ));
        }
        Ok(())
    }

    /// Basic `local@domain.tld` shape check.
    pub fn is_email(value: &str, field: &str) -> Result<()> {
        let valid = value
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid {
            return Err(ConfigError::validation(field, format!("'{}' is not an email address", value)));
        }
        Ok(())
    }

    pub fn is_port(value: u16, field: &str) -> Result<()> {
        if value == 0 {
            return Err(ConfigError::validation(field, "port cannot be 0"));
        }
        Ok(())
    }
}
