//! Integration tests for logging system

use core_runtime::logging::{
    init_logging, redact_if_sensitive, strip_path, LogFormat, LogLevel, LoggingConfig,
};

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Pretty)
        .with_level(LogLevel::Warn)
        .with_target(true)
        .with_ansi(false);

    assert_eq!(config.format, LogFormat::Pretty);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(config.display_target);
    assert!(!config.ansi);
    assert!(config.log_file.is_none());
}

#[test]
fn test_pii_redaction_tokens() {
    assert_eq!(
        redact_if_sensitive("access_token", "ya29.sensitive"),
        "[REDACTED]"
    );
    assert_eq!(
        redact_if_sensitive("refresh_token", "1//refresh"),
        "[REDACTED]"
    );
    assert_eq!(redact_if_sensitive("client_secret", "shh"), "[REDACTED]");
}

#[test]
fn test_pii_redaction_emails() {
    let redacted = redact_if_sensitive("email", "user@example.com");

    assert!(redacted.starts_with('u'));
    assert!(redacted.contains("[REDACTED]"));
    assert!(!redacted.contains("example.com"));
}

#[test]
fn test_path_stripping() {
    assert_eq!(strip_path("/home/user/pull/song.mp3"), "song.mp3");
    assert_eq!(strip_path("D:\\data\\file.txt"), "file.txt");
    assert_eq!(strip_path("filename.txt"), "filename.txt");
    assert_eq!(strip_path(""), "");
}

// The global subscriber can only be installed once per process, so this is
// the only test in this binary that initializes it.
#[test]
fn test_events_are_appended_to_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("debug.log");
    std::fs::write(&log_path, "earlier run\n").unwrap();

    let guard = init_logging(
        LoggingConfig::default()
            .with_filter("info")
            .with_log_file(&log_path)
            .with_ansi(false),
    )
    .unwrap();
    assert!(guard.file_enabled());
    assert!(guard.file_error().is_none());

    tracing::info!(item = "report.pdf", "item finished");
    tracing::debug!("filtered out");
    drop(guard);

    let contents = std::fs::read_to_string(&log_path).unwrap();
    assert!(contents.starts_with("earlier run\n"));
    assert!(contents.contains("INFO"));
    assert!(contents.contains("item finished"));
    assert!(contents.contains("report.pdf"));
    assert!(!contents.contains("filtered out"));

    // A second subscriber cannot be installed.
    assert!(init_logging(LoggingConfig::default()).is_err());
}
