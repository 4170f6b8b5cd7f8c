//! Host log forwarding.
//!
//! `core-runtime` turns each `tracing` event into a [`LogEntry`] and hands it
//! to the host's [`LoggerSink`] (OSLog, Logcat, a desktop log file). Field
//! values are already redacted by the time they get here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{error::Result, platform::PlatformSendSync};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Lowercase name, also valid as an `EnvFilter` directive.
    pub fn as_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.as_filter_directive().to_ascii_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Module path of the event, e.g. `core_playback::engine`.
    pub target: String,
    pub message: String,
    /// Structured fields in key order.
    pub fields: BTreeMap<String, String>,
    /// Name of the innermost span the event was recorded in.
    pub span: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: BTreeMap::new(),
            span: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn in_span(mut self, span: impl Into<String>) -> Self {
        self.span = Some(span.into());
        self
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:5} {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.level,
            self.target
        )?;
        if let Some(span) = &self.span {
            write!(f, "::{span}")?;
        }
        write!(f, ": {}", self.message)?;
        for (key, value) in &self.fields {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

/// Receives log entries from the core.
///
/// Entries below [`min_level`](LoggerSink::min_level) are dropped before
/// `log` is called.
#[async_trait::async_trait]
pub trait LoggerSink: PlatformSendSync {
    async fn log(&self, entry: LogEntry) -> Result<()>;

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Sink that prints one line per entry to stdout. Handy in demos.
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    pub min_level: LogLevel,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
        }
    }
}

#[async_trait::async_trait]
impl LoggerSink for ConsoleLogger {
    async fn log(&self, entry: LogEntry) -> Result<()> {
        println!("{entry}");
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_entry_renders_span_and_fields() {
        let mut entry = LogEntry::new(LogLevel::Warn, "core_auth::manager", "Login rejected")
            .with_field("status", "401")
            .with_field("email", "d***@[REDACTED]")
            .in_span("login");
        entry.timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap();

        assert_eq!(
            entry.to_string(),
            "12:30:05.000 WARN  core_auth::manager::login: Login rejected \
             email=d***@[REDACTED] status=401"
        );
    }

    #[test]
    fn test_level_names() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert_eq!(LogLevel::Error.as_filter_directive(), "error");
        assert_eq!(serde_json::to_string(&LogLevel::Warn).unwrap(), "\"warn\"");
    }

    #[tokio::test]
    async fn test_console_logger_defaults() {
        let logger = ConsoleLogger::default();
        assert_eq!(logger.min_level(), LogLevel::Info);
        logger
            .log(LogEntry::new(LogLevel::Info, "demo", "hello"))
            .await
            .unwrap();
        logger.flush().await.unwrap();
    }
}
