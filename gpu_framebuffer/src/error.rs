//! Error types for the framebuffer layer
//!
//! Every fallible operation returns `gpufb::Result`. Errors are local to
//! the operation that produced them: nothing here is fatal to the process.

use std::fmt;

/// Result type for framebuffer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reason reported by the device when a framebuffer is not renderable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncompleteReason {
    /// The default target is bound where a framebuffer object was expected
    Undefined,
    /// An attached image is not attachable (zero size, wrong role, ...)
    IncompleteAttachment,
    /// No image is attached at all
    MissingAttachment,
    /// A selected draw buffer points to an empty attachment
    IncompleteDrawBuffer,
    /// The selected read buffer points to an empty attachment
    IncompleteReadBuffer,
    /// The combination of formats is not supported by the device
    Unsupported,
    /// Attached images disagree on their sample count
    IncompleteMultisample,
}

impl fmt::Display for IncompleteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            IncompleteReason::Undefined => "undefined framebuffer",
            IncompleteReason::IncompleteAttachment => "incomplete attachment",
            IncompleteReason::MissingAttachment => "missing attachment",
            IncompleteReason::IncompleteDrawBuffer => "incomplete draw buffer",
            IncompleteReason::IncompleteReadBuffer => "incomplete read buffer",
            IncompleteReason::Unsupported => "unsupported combination",
            IncompleteReason::IncompleteMultisample => "incomplete multisample",
        };
        f.write_str(reason)
    }
}

/// Framebuffer layer errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The device could not allocate an object
    ResourceCreation(String),

    /// Colour slot index out of range
    InvalidSlot {
        /// Requested slot
        slot: usize,
        /// Number of colour slots available
        max: usize,
    },

    /// The selected colour slot holds no surface
    EmptySlot(usize),

    /// The device rejected the attachment combination
    FramebufferIncomplete(IncompleteReason),

    /// Caller misuse that is not covered by a more specific variant
    InvalidArgument(String),

    /// The device failed an otherwise valid call
    BackendError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ResourceCreation(msg) => write!(f, "Resource creation failed: {}", msg),
            Error::InvalidSlot { slot, max } => {
                write!(f, "Invalid framebuffer slot {} (at most {} slots)", slot, max)
            }
            Error::EmptySlot(slot) => write!(f, "Framebuffer slot {} is empty", slot),
            Error::FramebufferIncomplete(reason) => {
                write!(f, "Framebuffer incomplete: {}", reason)
            }
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Build a `BackendError`, logging it at ERROR level with file:line
///
/// # Example
///
/// ```ignore
/// let err = gpu_err!("gpufb::mock", "unknown handle {}", handle);
/// ```
#[macro_export]
macro_rules! gpu_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::gpu_error!($source, "{}", message);
        $crate::gpufb::Error::BackendError(message)
    }};
}

/// Return early with a `BackendError` built by `gpu_err!`
#[macro_export]
macro_rules! gpu_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::gpu_err!($source, $($arg)*))
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
