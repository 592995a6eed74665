//! Global subscriber installation

use bridge_traits::LogLevel;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_runtime::Error;

#[test]
fn test_global_init_only_once() {
    // The global subscriber can be installed once per process, so both
    // halves live in one test.
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug);

    init_logging(config).unwrap();
    tracing::info!(target: "core_sync", photos = 3, "logging initialized");

    let again = init_logging(LoggingConfig::default());
    assert!(matches!(again, Err(Error::Logging(_))));
}

#[test]
fn test_invalid_filter_is_rejected_before_install() {
    let config = LoggingConfig::default().with_filter("core_sync=notalevel");
    assert!(matches!(init_logging(config), Err(Error::Logging(msg)) if msg.contains("invalid filter")));
}

#[test]
fn test_builder_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Warn)
        .with_spans(true);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(config.spans);
    assert!(config.sink.is_none());
}
