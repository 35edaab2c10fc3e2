//! Configuration file loaders.

use crate::env::coerce;
use crate::{ConfigError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "env" => Some(FileFormat::Env),
            _ => None,
        }
    }

    /// Detect the format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        Self::from_extension(ext).ok_or_else(|| ConfigError::UnsupportedFormat(ext.to_string()))
    }

    fn name(&self) -> &'static str {
        match self {
            FileFormat::Json => "JSON",
            FileFormat::Toml => "TOML",
            FileFormat::Env => "env",
        }
    }
}

/// Parses one configuration source into a flat map of options.
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Loader for whatever format `path` has.
    pub fn auto(path: &Path) -> Result<Self> {
        FileFormat::from_path(path).map(Self::new)
    }

    /// Read and parse a file.
    pub fn load_file(&self, path: &Path) -> Result<Map<String, Value>> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        self.parse(&content)
    }

    /// Parse configuration text. The top level must be a table/object.
    pub fn parse(&self, content: &str) -> Result<Map<String, Value>> {
        let value = match self.format {
            FileFormat::Json => serde_json::from_str(content).map_err(|e| self.error(e))?,
            FileFormat::Toml => {
                let table: toml::Table = toml::from_str(content).map_err(|e| self.error(e))?;
                serde_json::to_value(table)?
            }
            FileFormat::Env => Value::Object(parse_env(content)),
        };

        match value {
            Value::Object(map) => Ok(map),
            other => Err(ConfigError::Parse {
                format: self.format.name(),
                message: format!("expected a table at the top level, found {}", other),
            }),
        }
    }

    fn error(&self, err: impl std::fmt::Display) -> ConfigError {
        ConfigError::Parse {
            format: self.format.name(),
            message: err.to_string(),
        }
    }
}

fn parse_env(content: &str) -> Map<String, Value> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (key.trim().to_lowercase(), coerce(value))
        })
        .collect()
}
