//! Layered construction of a [`ConfigManager`].

use crate::{ConfigError, ConfigManager, FileFormat, Result};
use std::path::PathBuf;
use tracing::debug;

/// Builds a [`ConfigManager`] from files, a `.env` file and the environment.
///
/// Sources are applied in this order, later ones overriding earlier ones:
/// files (in the order added), then `.env`, then process environment.
pub struct ConfigBuilder {
    manager: ConfigManager,
    load_env: bool,
    load_dotenv: bool,
    dotenv_path: Option<PathBuf>,
    files: Vec<(PathBuf, Option<FileFormat>)>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            manager: ConfigManager::new(),
            load_env: false,
            load_dotenv: false,
            dotenv_path: None,
            files: Vec::new(),
        }
    }

    /// Set the environment variable prefix. Defaults to `REMINDERS`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.manager = ConfigManager::with_prefix(prefix);
        self
    }

    /// Read prefixed variables from the process environment.
    pub fn load_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Read a `.env` file into the environment first. `None` looks in the
    /// current directory and its parents and ignores a missing file.
    pub fn load_dotenv(mut self, path: Option<PathBuf>) -> Self {
        self.load_dotenv = true;
        self.dotenv_path = path;
        self
    }

    /// Add a file. The format comes from the extension.
    pub fn add_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push((path.into(), None));
        self
    }

    /// Add a file in an explicit format.
    pub fn add_file_as(mut self, path: impl Into<PathBuf>, format: FileFormat) -> Self {
        self.files.push((path.into(), Some(format)));
        self
    }

    pub fn build(self) -> Result<ConfigManager> {
        for (path, format) in &self.files {
            let format = match format {
                Some(format) => *format,
                None => FileFormat::from_path(path)?,
            };
            self.manager.load_file(path, format)?;
        }

        if self.load_dotenv {
            match &self.dotenv_path {
                Some(path) => {
                    dotenvy::from_path(path).map_err(|e| ConfigError::Dotenv(e.to_string()))?;
                }
                None => {
                    if let Err(e) = dotenvy::dotenv() {
                        debug!(error = %e, "No .env file loaded");
                    }
                }
            }
        }

        if self.load_env || self.load_dotenv {
            self.manager.load_env();
        }

        debug!(keys = self.manager.keys().len(), "Configuration loaded");
        Ok(self.manager)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
