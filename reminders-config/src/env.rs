//! Environment variable loading.

use serde_json::Value;
use std::collections::HashMap;
use std::env;

/// Default prefix for reminder settings in the environment.
pub const DEFAULT_PREFIX: &str = "REMINDERS";

/// Reads `PREFIX_KEY=value` variables as lower-case `key` options.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load from the process environment.
    pub fn load(&self) -> HashMap<String, Value> {
        self.load_from(env::vars())
    }

    /// Load from an explicit list of variables.
    pub fn load_from<I, K, V>(&self, vars: I) -> HashMap<String, Value>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        vars.into_iter()
            .filter_map(|(key, value)| {
                let key = self.strip(key.as_ref())?;
                Some((key.to_lowercase(), coerce(value.as_ref())))
            })
            .collect()
    }

    fn strip<'a>(&self, key: &'a str) -> Option<&'a str> {
        match &self.prefix {
            Some(prefix) => key
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
                .filter(|rest| !rest.is_empty()),
            None => Some(key),
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(Some(DEFAULT_PREFIX.to_string()))
    }
}

/// Turn a raw string into the JSON value it spells.
///
/// Numbers and booleans become typed values; JSON objects and arrays are
/// parsed; everything else stays a string.
pub fn coerce(raw: &str) -> Value {
    let trimmed = raw.trim();

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str(trimmed) {
            return value;
        }
    }

    match trimmed {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(n) = trimmed.parse::<i64>() {
        return Value::from(n);
    }

    Value::String(raw.to_string())
}
