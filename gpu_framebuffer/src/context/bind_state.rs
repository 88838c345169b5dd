/// Record of the framebuffer bound for rendering on one device context
///
/// Pure bookkeeping. The context writes it whenever it changes the combined
/// binding, and reads it to skip redundant binds and to know whether a freed
/// framebuffer was the active one.

use crate::device::DeviceHandle;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceBindState {
    /// `None` is the default device target
    current: Option<DeviceHandle>,
}

impl DeviceBindState {
    /// Fresh state, default target bound
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `framebuffer` is now bound (`None` for the default target)
    pub fn record_bound(&mut self, framebuffer: Option<DeviceHandle>) {
        self.current = framebuffer;
    }

    /// Whether `framebuffer` is the one currently bound
    pub fn is_currently_bound(&self, framebuffer: Option<DeviceHandle>) -> bool {
        self.current == framebuffer
    }

    /// Forget the current framebuffer, back to the default target
    pub fn restore_default(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<DeviceHandle> {
        self.current
    }
}

#[cfg(test)]
#[path = "bind_state_tests.rs"]
mod tests;
