//! Logging system demonstration
//!
//! Shows the output formats and the redaction helpers using the kind of
//! events the session provider and the playback engine produce.
//!
//! Run with:
//! ```bash
//! # Pretty format (default in debug)
//! cargo run --example logging_demo
//!
//! # JSON format, mirrored into the console host sink
//! cargo run --example logging_demo -- json sink
//!
//! # Compact format
//! cargo run --example logging_demo -- compact
//! ```

use bridge_traits::logger::{ConsoleLogger, LogLevel};
use core_runtime::logging::{
    init_logging, redact_if_sensitive, strip_path, LogFormat, LoggingConfig,
};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Debug)
        .with_spans(true)
        .with_target(true)
        // The demo binary is not one of the library crates the default filter covers.
        .with_filter("logging_demo=trace,core_runtime=debug");

    if args.get(2).map(String::as_str) == Some("sink") {
        config = config.with_logger_sink(Arc::new(ConsoleLogger::default()));
    }

    if let Err(e) = init_logging(config) {
        eprintln!("Failed to initialize logging: {e}");
        return;
    }

    info!(format = ?format, "Logging initialized");

    restore_session("ana@example.com", "tok-4f2a9c").await;
    play_track(12, "/home/ana/Music/uploads/night-drive.mp3").await;

    info!("Demo complete");
}

#[instrument(skip(email, token), fields(email = %redact_if_sensitive("email", email)))]
async fn restore_session(email: &str, token: &str) {
    debug!(
        token = %redact_if_sensitive("token", token),
        "Found persisted credential"
    );
    tokio::time::sleep(Duration::from_millis(10)).await;
    info!(user_id = 7, "Session restored");
}

#[instrument(skip(path), fields(file = %strip_path(path)))]
async fn play_track(track_id: u64, path: &str) {
    info!(session = 1, "Playback started");

    for second in 1..=3u64 {
        tokio::time::sleep(Duration::from_millis(5)).await;
        debug!(position_ms = second * 1_000, duration_ms = 3_000u64, "Position changed");
    }

    warn!(
        authorization = %redact_if_sensitive("authorization", "Bearer tok-4f2a9c"),
        "Media request retried by host player"
    );
    info!("Track completed");
}
