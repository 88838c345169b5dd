//! Unit tests for log.rs

use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
use std::sync::Mutex;
use std::time::SystemTime;

fn entry(severity: LogSeverity, location: bool) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "gpufb::FramebufferTarget".to_string(),
        message: format!("{:?} record", severity),
        file: location.then_some("framebuffer_target.rs"),
        line: location.then_some(42),
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_labels_have_fixed_width() {
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        assert_eq!(severity.label().len(), 5);
    }
    assert_eq!(LogSeverity::Warn.label().trim_end(), "WARN");
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_hides_trace() {
    let logger = DefaultLogger::default();
    assert!(!logger.accepts(LogSeverity::Trace));
    assert!(logger.accepts(LogSeverity::Debug));
    assert!(logger.accepts(LogSeverity::Error));
}

#[test]
fn test_default_logger_custom_floor() {
    let logger = DefaultLogger::with_min_severity(LogSeverity::Warn);
    assert!(!logger.accepts(LogSeverity::Info));
    assert!(logger.accepts(LogSeverity::Warn));
}

#[test]
fn test_default_logger_prints_every_severity_without_panicking() {
    let logger = DefaultLogger::with_min_severity(LogSeverity::Trace);
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        logger.log(&entry(severity, false));
        logger.log(&entry(severity, true));
    }
}

#[test]
fn test_log_entry_location_only_when_given() {
    let plain = entry(LogSeverity::Info, false);
    assert!(plain.file.is_none());
    assert!(plain.line.is_none());

    let located = entry(LogSeverity::Error, true);
    assert_eq!(located.file, Some("framebuffer_target.rs"));
    assert_eq!(located.line, Some(42));
}

// ============================================================================
// LOGGER TRAIT TESTS
// ============================================================================

struct CountingLogger {
    count: Mutex<usize>,
}

impl Logger for CountingLogger {
    fn log(&self, _entry: &LogEntry) {
        *self.count.lock().unwrap() += 1;
    }
}

#[test]
fn test_custom_logger_receives_entries() {
    let logger = CountingLogger { count: Mutex::new(0) };
    logger.log(&entry(LogSeverity::Info, false));
    logger.log(&entry(LogSeverity::Warn, false));
    assert_eq!(*logger.count.lock().unwrap(), 2);
}

#[test]
fn test_loggers_are_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
    assert_send_sync::<CountingLogger>();
}
