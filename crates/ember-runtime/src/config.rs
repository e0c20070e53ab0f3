//! Logger configuration

use std::path::PathBuf;
use std::time::Duration;

use ember_core::conlog::LogLevel;
use ember_core::env::{env_get, env_get_bool, env_get_opt};

/// Configuration for the asynchronous log thread
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Console log level applied when the logger starts
    pub level: LogLevel,

    /// Flush stderr after each direct (non-queued) write
    pub flush: bool,

    /// How long the drain thread sleeps when the queue is empty
    pub poll_interval: Duration,

    /// Log file path; `None` writes to stderr
    pub file: Option<PathBuf>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            flush: false,
            poll_interval: Duration::from_millis(1),
            file: None,
        }
    }
}

impl LoggerConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the console log level
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Enable or disable flushing after direct writes
    pub fn flush(mut self, enable: bool) -> Self {
        self.flush = enable;
        self
    }

    /// Set the empty-queue poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Write log records to `path` instead of stderr
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Defaults with environment overrides folded in
    ///
    /// Reads `EMBER_LOG_LEVEL`, `EMBER_LOG_FLUSH`, `EMBER_LOG_POLL_US`
    /// and `EMBER_LOG_FILE`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(raw) = env_get_opt::<String>("EMBER_LOG_LEVEL") {
            if let Some(level) = LogLevel::parse(&raw) {
                config.level = level;
            }
        }
        config.flush = env_get_bool("EMBER_LOG_FLUSH", config.flush);
        config.poll_interval = Duration::from_micros(env_get("EMBER_LOG_POLL_US", 1000u64));
        if let Some(path) = env_get_opt::<PathBuf>("EMBER_LOG_FILE") {
            config.file = Some(path);
        }
        config
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.poll_interval.is_zero() {
            return Err("poll interval must be non-zero");
        }
        if self.poll_interval > Duration::from_secs(1) {
            return Err("poll interval must be at most one second");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        assert!(LoggerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_intervals() {
        let config = LoggerConfig::new().poll_interval(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = LoggerConfig::new().poll_interval(Duration::from_secs(5));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder() {
        let config = LoggerConfig::new()
            .level(LogLevel::Trace)
            .flush(true)
            .poll_interval(Duration::from_micros(250))
            .file("/tmp/ember.log");
        assert_eq!(config.level, LogLevel::Trace);
        assert!(config.flush);
        assert_eq!(config.poll_interval, Duration::from_micros(250));
        assert_eq!(config.file.as_deref(), Some(std::path::Path::new("/tmp/ember.log")));
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("EMBER_LOG_POLL_US", "250");
        std::env::set_var("EMBER_LOG_FILE", "/tmp/ember-env.log");
        let config = LoggerConfig::from_env();
        assert_eq!(config.poll_interval, Duration::from_micros(250));
        assert_eq!(
            config.file.as_deref(),
            Some(std::path::Path::new("/tmp/ember-env.log"))
        );
        std::env::remove_var("EMBER_LOG_POLL_US");
        std::env::remove_var("EMBER_LOG_FILE");
    }
}
