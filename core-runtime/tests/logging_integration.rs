//! Integration tests for logging helpers and the global subscriber

use bridge_traits::logger::LogLevel;
use core_runtime::logging::{
    init_logging, redact_if_sensitive, strip_path, LogFormat, LoggingConfig,
};

#[test]
fn test_credentials_are_redacted() {
    assert_eq!(redact_if_sensitive("token", "eyJhbGciOi"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("auth_token", "abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("password", "hunter2"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("Authorization", "Bearer abc"), "[REDACTED]");
}

#[test]
fn test_emails_are_masked() {
    let redacted = redact_if_sensitive("email", "ana@example.com");

    assert!(redacted.starts_with('a'));
    assert!(redacted.contains("[REDACTED]"));
    assert!(!redacted.contains("example.com"));
}

#[test]
fn test_track_titles_with_at_sign_are_not_masked() {
    let title = "Live @ Madison Sq. Garden";
    assert_eq!(redact_if_sensitive("title", title), title);
    assert_eq!(redact_if_sensitive("artist", "Tyler @ the.Creator"), "Tyler @ the.Creator");
}

#[test]
fn test_plain_values_pass_through() {
    assert_eq!(redact_if_sensitive("track_id", "12345"), "12345");
    assert_eq!(redact_if_sensitive("title", "Blue in Green"), "Blue in Green");
    assert_eq!(redact_if_sensitive("user_id", "user_123"), "user_123");
}

#[test]
fn test_storage_paths_are_stripped() {
    assert_eq!(strip_path("uploads/songs/1699.mp3"), "1699.mp3");
    assert_eq!(strip_path("/uploads/covers/a.jpg"), "a.jpg");
    assert_eq!(strip_path("D:\\music\\b.mp3"), "b.mp3");
    assert_eq!(strip_path(""), "");
}

#[test]
fn test_init_logging_only_once() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_spans(false);

    // This test binary installs the global subscriber exactly once.
    init_logging(config.clone()).expect("first initialization succeeds");
    assert!(init_logging(config).is_err());
}

#[test]
fn test_invalid_filter_is_rejected() {
    let config = LoggingConfig::default().with_filter("core_auth=loudest");
    assert!(init_logging(config).is_err());
}
