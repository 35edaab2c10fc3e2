//! Tracing setup for the `reminders` binary.
//!
//! # Environment Variables
//!
//! - `REMINDERS_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level (default `info`)
//! - `REMINDERS_DEBUG=1` - Force debug logging
//! - `REMINDERS_LOG_FORMAT=json|pretty|compact` - Set output format (default `json`)
//! - `RUST_LOG` - Full filter directive, overrides the level
//!
//! Logs go to stderr so command output on stdout stays machine readable.

use std::io;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LEVEL_VAR: &str = "REMINDERS_LOG_LEVEL";
pub const DEBUG_VAR: &str = "REMINDERS_DEBUG";
pub const FORMAT_VAR: &str = "REMINDERS_LOG_FORMAT";

/// Log level for filtering messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            "off" | "none" => Some(LogLevel::Off),
            _ => None,
        }
    }

    /// Directive string for `EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

/// Output format for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured, machine-readable (default)
    Json,
    /// Multi-line, for development
    Pretty,
    /// Single line per event
    Compact,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "pretty" => Some(LogFormat::Pretty),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Include target (module path)
    pub targets: bool,
    pub colors: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            targets: true,
            colors: false,
        }
    }
}

impl LogConfig {
    /// Read the `REMINDERS_LOG_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unknown values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(level) = lookup(LEVEL_VAR).as_deref().and_then(LogLevel::parse) {
            config.level = level;
        }
        if lookup(DEBUG_VAR).is_some_and(|v| matches!(v.trim(), "1" | "true" | "yes")) {
            config.level = LogLevel::Debug;
        }
        if let Some(format) = lookup(FORMAT_VAR).as_deref().and_then(LogFormat::parse) {
            config.format = format;
            config.colors = format != LogFormat::Json;
        }
        config
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Install the global subscriber. Keep the guard alive until exit so
    /// buffered lines are flushed.
    ///
    /// A subscriber installed earlier stays in place.
    pub fn init(self) -> WorkerGuard {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str()));
        let (writer, guard) = tracing_appender::non_blocking(io::stderr());

        let registry = tracing_subscriber::registry().with(env_filter);
        let installed = match self.format {
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_target(self.targets),
                )
                .try_init(),
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_writer(writer)
                        .with_target(self.targets)
                        .with_ansi(self.colors),
                )
                .try_init(),
            LogFormat::Compact => registry
                .with(
                    fmt::layer()
                        .compact()
                        .with_writer(writer)
                        .with_target(self.targets)
                        .with_ansi(self.colors),
                )
                .try_init(),
        };

        if let Err(e) = installed {
            tracing::debug!(error = %e, "Tracing subscriber already installed");
        }
        guard
    }
}
