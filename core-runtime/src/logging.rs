//! # Logging & Tracing Infrastructure
//!
//! Every crate in the workspace logs through `tracing`. [`init_logging`]
//! installs one global subscriber made of three layers:
//!
//! 1. an `EnvFilter` (workspace crates at the configured level, the HTTP
//!    stack at `warn`, or a caller-supplied directive string)
//! 2. a `fmt` layer writing to stdout as pretty, JSON or compact text
//! 3. a host layer mirroring each surviving event into a [`LoggerSink`], so
//!    mobile shells can route core logs into `os_log` or Logcat
//!
//! Field values forwarded to the host sink pass through
//! [`redact_if_sensitive`]. Call sites still must not log credentials.
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use bridge_traits::logger::LogLevel;
//!
//! init_logging(
//!     LoggingConfig::default()
//!         .with_format(LogFormat::Compact)
//!         .with_level(LogLevel::Debug),
//! )?;
//! tracing::info!("Player ready");
//! ```

use crate::error::{Error, Result};
use bridge_traits::logger::{LogEntry, LogLevel, LoggerSink};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

/// Targets that follow the configured level when no custom filter is set.
const WORKSPACE_TARGETS: &[&str] = &[
    "musicapp_core",
    "core_runtime",
    "core_auth",
    "core_playback",
    "core_service",
    "bridge_desktop",
];

/// Chatty dependencies capped at `warn`.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls"];

const REDACTED: &str = "[REDACTED]";

/// Field names whose values are never forwarded verbatim.
const SENSITIVE_FIELDS: &[&str] = &[
    "token",
    "password",
    "secret",
    "authorization",
    "bearer",
    "credential",
];

/// Field names whose e-mail-like values are masked.
const EMAIL_FIELDS: &[&str] = &["email", "user"];

/// Output format of the stdout layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, colored; debug builds default to this.
    Pretty,
    /// One JSON object per event; release builds default to this.
    Json,
    /// One line per event.
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level applied to the workspace crates by the default filter.
    pub level: LogLevel,
    /// `EnvFilter` directives replacing the default filter entirely,
    /// e.g. `"core_auth=debug,core_playback=trace"`.
    pub filter: Option<String>,
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Log span activity (pretty) or the span list (JSON).
    pub enable_spans: bool,
    pub display_target: bool,
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            logger_sink: None,
            enable_spans: true,
            display_target: true,
            display_thread_info: false,
        }
    }
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("filter", &self.filter)
            .field("has_logger_sink", &self.logger_sink.is_some())
            .field("enable_spans", &self.enable_spans)
            .finish_non_exhaustive()
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Mirror events into a host logger.
    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }
}

/// Install the global subscriber.
///
/// Only the first call in a process succeeds; later calls, and invalid filter
/// directives, return [`Error::Config`].
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;

    let stdout_layer = match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(config.display_target)
            .with_thread_ids(config.display_thread_info)
            .with_thread_names(config.display_thread_info)
            .with_span_events(span_events(config.enable_spans))
            .with_writer(io::stdout)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(config.enable_spans)
            .with_span_list(config.enable_spans)
            .with_target(config.display_target)
            .with_thread_ids(config.display_thread_info)
            .with_thread_names(config.display_thread_info)
            .with_writer(io::stdout)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(config.display_target)
            .with_thread_ids(config.display_thread_info)
            .with_thread_names(config.display_thread_info)
            .with_writer(io::stdout)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(HostSinkLayer::new(config.logger_sink))
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {e}")))
}

fn span_events(enabled: bool) -> FmtSpan {
    if enabled {
        FmtSpan::ACTIVE
    } else {
        FmtSpan::NONE
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = config
        .filter
        .clone()
        .unwrap_or_else(|| default_directives(config.level));

    EnvFilter::try_new(&directives)
        .map_err(|e| Error::Config(format!("Invalid log filter '{directives}': {e}")))
}

fn default_directives(level: LogLevel) -> String {
    let level = level.as_filter_directive();
    WORKSPACE_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .chain(QUIET_TARGETS.iter().map(|target| format!("{target}=warn")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Forwards events to the host [`LoggerSink`].
pub(crate) struct HostSinkLayer {
    sink: Option<Arc<dyn LoggerSink>>,
}

impl HostSinkLayer {
    pub(crate) fn new(sink: Option<Arc<dyn LoggerSink>>) -> Self {
        Self { sink }
    }
}

impl<S> Layer<S> for HostSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = &self.sink else {
            return;
        };

        let metadata = event.metadata();
        let level = log_level(metadata.level());
        if level < sink.min_level() {
            return;
        }

        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let message = fields
            .message
            .take()
            .unwrap_or_else(|| metadata.name().to_string());
        let mut entry = fields
            .values
            .into_iter()
            .fold(LogEntry::new(level, metadata.target(), message), |entry, (k, v)| {
                entry.with_field(k, v)
            });
        if let Some(span) = ctx.lookup_current() {
            entry = entry.in_span(span.name());
        }

        let sink = Arc::clone(sink);
        match tokio::runtime::Handle::try_current() {
            // Never block a runtime worker on the host logger.
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = sink.log(entry).await {
                        eprintln!("LoggerSink error: {e}");
                    }
                });
            }
            Err(_) => {
                if let Err(e) = futures::executor::block_on(sink.log(entry)) {
                    eprintln!("LoggerSink error: {e}");
                }
            }
        }
    }
}

fn log_level(level: &tracing::Level) -> LogLevel {
    match *level {
        tracing::Level::TRACE => LogLevel::Trace,
        tracing::Level::DEBUG => LogLevel::Debug,
        tracing::Level::INFO => LogLevel::Info,
        tracing::Level::WARN => LogLevel::Warn,
        tracing::Level::ERROR => LogLevel::Error,
    }
}

/// Collects event fields as redacted strings.
#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    values: HashMap<String, String>,
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.values.insert(
                field.name().to_string(),
                redact_if_sensitive(field.name(), value),
            );
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record_str(field, &value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_str(field, &format!("{value:?}"));
    }
}

/// Redacts values of credential-like fields and masks e-mail addresses held
/// by e-mail or user fields. Other fields pass through even if they contain `@`.
///
/// ```
/// use core_runtime::logging::redact_if_sensitive;
///
/// assert_eq!(redact_if_sensitive("token", "abc"), "[REDACTED]");
/// assert_eq!(redact_if_sensitive("email", "ana@example.com"), "a***@[REDACTED]");
/// assert_eq!(redact_if_sensitive("track_id", "12"), "12");
/// assert_eq!(redact_if_sensitive("title", "Live @ M.S.G."), "Live @ M.S.G.");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    let name = field_name.to_ascii_lowercase();
    if SENSITIVE_FIELDS.iter().any(|sensitive| name.contains(sensitive)) {
        return REDACTED.to_string();
    }
    if !EMAIL_FIELDS.iter().any(|field| name.contains(field)) {
        return value.to_string();
    }

    match value.split_once('@') {
        Some((local, domain)) if domain.contains('.') => {
            let initial = local.chars().next().map(String::from).unwrap_or_default();
            format!("{initial}***@{REDACTED}")
        }
        _ => value.to_string(),
    }
}

/// Reduce a storage path to its file name so logs don't leak directory layout.
///
/// ```
/// use core_runtime::logging::strip_path;
///
/// assert_eq!(strip_path("uploads/songs/intro.mp3"), "intro.mp3");
/// ```
pub fn strip_path(path: &str) -> &str {
    path.rsplit(&['/', '\\'][..]).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as SinkResult;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CapturingSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    #[async_trait]
    impl LoggerSink for CapturingSink {
        async fn log(&self, entry: LogEntry) -> SinkResult<()> {
            self.entries.lock().push(entry);
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            LogLevel::Debug
        }
    }

    #[test]
    fn test_builder_overrides_defaults() {
        let config = LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Trace)
            .with_filter("core_playback=trace")
            .with_spans(false)
            .with_thread_info(true);

        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.level, LogLevel::Trace);
        assert_eq!(config.filter.as_deref(), Some("core_playback=trace"));
        assert!(!config.enable_spans);
        assert!(config.display_target);
        assert!(config.display_thread_info);
        assert!(format!("{config:?}").contains("has_logger_sink: false"));
    }

    #[test]
    fn test_default_format_follows_build_profile() {
        let expected = if cfg!(debug_assertions) {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        };
        assert_eq!(LogFormat::default(), expected);
    }

    #[test]
    fn test_default_directives() {
        let directives = default_directives(LogLevel::Debug);
        for target in WORKSPACE_TARGETS {
            assert!(directives.contains(&format!("{target}=debug")));
        }
        assert!(directives.contains("reqwest=warn"));
        assert!(build_filter(&LoggingConfig::default()).is_ok());
    }

    #[test]
    fn test_custom_filter_replaces_default() {
        let config = LoggingConfig::default().with_filter("core_auth=trace");
        let filter = build_filter(&config).unwrap().to_string();
        assert!(filter.contains("core_auth=trace"));
        assert!(!filter.contains("reqwest"));
    }

    #[test]
    fn test_redaction_rules() {
        assert_eq!(redact_if_sensitive("Authorization", "Bearer x"), REDACTED);
        assert_eq!(redact_if_sensitive("new_password", "pw"), REDACTED);
        assert_eq!(redact_if_sensitive("email", "@example.com"), "***@[REDACTED]");
        assert_eq!(redact_if_sensitive("title", "Live @ Home"), "Live @ Home");
        assert_eq!(redact_if_sensitive("username", "ana@example.com"), "a***@[REDACTED]");
    }

    #[test]
    fn test_at_sign_in_non_email_fields_is_kept() {
        let title = "Live @ Madison Sq. Garden";
        assert_eq!(redact_if_sensitive("title", title), title);
        assert_eq!(redact_if_sensitive("album", "a@b.c"), "a@b.c");
        assert_eq!(redact_if_sensitive("Email", "ana@example.com"), "a***@[REDACTED]");
        assert_eq!(redact_if_sensitive("user_id", "user_123"), "user_123");
    }

    #[test]
    fn test_strip_path_handles_both_separators() {
        assert_eq!(strip_path("/uploads/songs/song.mp3"), "song.mp3");
        assert_eq!(strip_path("C:\\Music\\song.mp3"), "song.mp3");
        assert_eq!(strip_path("song.mp3"), "song.mp3");
        assert_eq!(strip_path("uploads/"), "");
    }

    #[test]
    fn test_host_layer_forwards_redacted_fields() {
        let sink = Arc::new(CapturingSink::default());
        let subscriber =
            tracing_subscriber::registry().with(HostSinkLayer::new(Some(sink.clone())));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(
                target: "core_playback::engine",
                track_id = 7,
                token = "abc",
                title = "Live @ Madison Sq. Garden",
                user = "ana@example.com",
                "Playback started"
            );
            tracing::trace!(target: "core_playback::engine", "below sink level");
        });

        let entries = sink.entries.lock();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.target, "core_playback::engine");
        assert_eq!(entry.message, "Playback started");
        assert_eq!(entry.fields.get("track_id").map(String::as_str), Some("7"));
        assert_eq!(entry.fields.get("token").map(String::as_str), Some(REDACTED));
        assert_eq!(
            entry.fields.get("title").map(String::as_str),
            Some("Live @ Madison Sq. Garden")
        );
        assert_eq!(
            entry.fields.get("user").map(String::as_str),
            Some("a***@[REDACTED]")
        );
    }
}
