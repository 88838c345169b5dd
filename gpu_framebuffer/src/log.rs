//! Logging for the framebuffer layer
//!
//! Log records flow through a single replaceable `Logger` held by the
//! `Gpu` facade. The `gpu_*!` macros are the only producers inside the
//! crate; applications install their own sink with `Gpu::set_logger`.

use colored::*;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Sink for log records
///
/// # Example
///
/// ```no_run
/// use gpu_framebuffer::gpufb::log::{Logger, LogEntry};
///
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, entry: &LogEntry) {
///         eprintln!("{} {}", entry.source, entry.message);
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Consume one record
    fn log(&self, entry: &LogEntry);
}

/// One log record
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Severity level
    pub severity: LogSeverity,

    /// Creation time
    pub timestamp: SystemTime,

    /// Emitting component (e.g. "gpufb::FramebufferTarget")
    pub source: String,

    /// Formatted message
    pub message: String,

    /// Source file, only set for ERROR records
    pub file: Option<&'static str>,

    /// Source line, only set for ERROR records
    pub line: Option<u32>,
}

/// Log severity levels, ordered from most to least verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    /// Per-call chatter (redundant binds skipped, ...)
    Trace,

    /// Object lifetime events
    Debug,

    /// Notable but expected decisions (sample clamping, ...)
    Info,

    /// Hazards that do not fail the operation
    Warn,

    /// Failed operations, reported with file:line
    Error,
}

impl LogSeverity {
    /// Fixed-width label used by `DefaultLogger`
    pub fn label(self) -> &'static str {
        match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO ",
            LogSeverity::Warn => "WARN ",
            LogSeverity::Error => "ERROR",
        }
    }
}

/// Colored console logger
///
/// Format: `[timestamp] [SEVERITY] [source] message (file:line)`, the
/// location suffix only for ERROR records. Records below `min_severity`
/// are dropped.
pub struct DefaultLogger {
    /// Least severe level that gets printed
    pub min_severity: LogSeverity,
}

impl DefaultLogger {
    /// Console logger printing everything from `min_severity` up
    pub fn with_min_severity(min_severity: LogSeverity) -> Self {
        Self { min_severity }
    }

    /// Whether a record of this severity would be printed
    pub fn accepts(&self, severity: LogSeverity) -> bool {
        severity >= self.min_severity
    }
}

impl Default for DefaultLogger {
    /// Hides TRACE, which fires on every skipped rebind
    fn default() -> Self {
        Self::with_min_severity(LogSeverity::Debug)
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        if !self.accepts(entry.severity) {
            return;
        }

        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        let label = entry.severity.label();
        let severity = match entry.severity {
            LogSeverity::Trace => label.bright_black(),
            LogSeverity::Debug => label.cyan(),
            LogSeverity::Info => label.green(),
            LogSeverity::Warn => label.yellow(),
            LogSeverity::Error => label.red().bold(),
        };
        let source = entry.source.bright_blue();

        match (entry.file, entry.line) {
            (Some(file), Some(line)) => println!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp, severity, source, entry.message, file, line
            ),
            _ => println!("[{}] [{}] [{}] {}", timestamp, severity, source, entry.message),
        }
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message
///
/// ```ignore
/// gpu_trace!("gpufb::GpuContext", "Skipping redundant bind of {:?}", handle);
/// ```
#[macro_export]
macro_rules! gpu_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::gpufb::Gpu::log(
            $crate::gpufb::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a DEBUG message
///
/// ```ignore
/// gpu_debug!("gpufb::GpuContext", "Created framebuffer {:?}", handle);
/// ```
#[macro_export]
macro_rules! gpu_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::gpufb::Gpu::log(
            $crate::gpufb::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an INFO message
#[macro_export]
macro_rules! gpu_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::gpufb::Gpu::log(
            $crate::gpufb::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a WARN message
///
/// ```ignore
/// gpu_warn!("gpufb::FramebufferTarget", "Feedback loop hazard on {:?}", surface);
/// ```
#[macro_export]
macro_rules! gpu_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::gpufb::Gpu::log(
            $crate::gpufb::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
#[macro_export]
macro_rules! gpu_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::gpufb::Gpu::log_detailed(
            $crate::gpufb::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
