/// Rasterizer state saved around scoped binds, and the guard that restores it

use std::ops::{Deref, DerefMut};
use crate::context::GpuContext;
use crate::device::{GraphicsDevice, Rect2D};

/// Viewport and enable bits a scoped bind may change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterState {
    pub viewport: Rect2D,
    pub scissor_test: bool,
    pub multisample: bool,
}

impl Default for RasterState {
    fn default() -> Self {
        Self {
            viewport: Rect2D::default(),
            scissor_test: true,
            multisample: false,
        }
    }
}

/// Guard returned by the binds that push rasterizer state
///
/// Borrows the context mutably for as long as the target is in use, so all
/// drawing goes through it (it derefs to the `GpuContext`). Dropping it, or
/// calling [`TargetScope::release`], restores the state that was active
/// before the bind. Scopes created by an offscreen bind additionally return
/// the device to its default target and re-enable the scissor test.
pub struct TargetScope<'a, D: GraphicsDevice> {
    context: &'a mut GpuContext<D>,
    saved: Option<RasterState>,
    restore_default: bool,
}

impl<'a, D: GraphicsDevice> TargetScope<'a, D> {
    /// Save the current state of `context`, to be restored on drop
    pub(crate) fn save(context: &'a mut GpuContext<D>) -> Self {
        let saved = Some(context.raster);
        Self { context, saved, restore_default: false }
    }

    /// Scope that restores nothing but the default binding
    pub(crate) fn unsaved(context: &'a mut GpuContext<D>) -> Self {
        Self { context, saved: None, restore_default: true }
    }

    /// Also rebind the default target when the scope ends
    pub(crate) fn restoring_default(mut self) -> Self {
        self.restore_default = true;
        self
    }

    /// Whether leaving the scope restores pushed state
    pub fn preserves_state(&self) -> bool {
        self.saved.is_some()
    }

    /// End the scope now
    pub fn release(self) {}
}

impl<D: GraphicsDevice> Deref for TargetScope<'_, D> {
    type Target = GpuContext<D>;

    fn deref(&self) -> &Self::Target {
        self.context
    }
}

impl<D: GraphicsDevice> DerefMut for TargetScope<'_, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.context
    }
}

impl<D: GraphicsDevice> Drop for TargetScope<'_, D> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.context.apply_raster_state(saved);
        }
        if self.restore_default {
            self.context.restore_default_binding();
            self.context.set_scissor_test(true);
        }
    }
}

#[cfg(test)]
#[path = "raster_state_tests.rs"]
mod tests;
