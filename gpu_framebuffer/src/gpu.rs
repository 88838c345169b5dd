/// Global logging facade
///
/// The framebuffer state itself lives in an explicit `GpuContext`; only the
/// log sink is process-wide, so every context and every backend reports
/// through the same `Logger`.

use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use crate::error::Error;
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

fn logger() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger::default())))
}

/// Entry point for the process-wide log sink
///
/// # Example
///
/// ```no_run
/// use gpu_framebuffer::gpufb::{Gpu, log::{Logger, LogEntry}};
///
/// struct Quiet;
/// impl Logger for Quiet {
///     fn log(&self, _entry: &LogEntry) {}
/// }
///
/// Gpu::set_logger(Quiet);
/// ```
pub struct Gpu;

impl Gpu {
    /// Replace the current logger
    pub fn set_logger<L: Logger + 'static>(logger_impl: L) {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(logger_impl);
        }
    }

    /// Go back to the colored console logger
    pub fn reset_logger() {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(DefaultLogger::default());
        }
    }

    /// Emit a record without location (used by `gpu_trace!` .. `gpu_warn!`)
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Emit a record with file:line (used by `gpu_error!`)
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }

    /// Log an error at ERROR level and hand it back for propagation
    ///
    /// `BackendError`s were already logged by `gpu_err!` where the device
    /// raised them, so they pass through unlogged.
    pub(crate) fn log_and_return_error(source: &str, error: Error) -> Error {
        if !matches!(error, Error::BackendError(_)) {
            crate::gpu_error!(source, "{}", error);
        }
        error
    }
}
