/// FramebufferTarget - a device framebuffer with four colour slots and a depth slot
///
/// The target holds surface keys, never the surfaces themselves: whoever
/// created a surface owns it. Lifecycle operations (create, free,
/// completeness, bound query) live here; attachment, binding, blits and the
/// blur composite are in the sibling modules.

use slotmap::new_key_type;
use crate::error::{Error, Result};
use crate::gpu::Gpu;
use crate::context::GpuContext;
use crate::device::{BindPoint, DeviceHandle, FramebufferStatus, GraphicsDevice};
use crate::surface::SurfaceKey;

const SOURCE: &str = "gpufb::FramebufferTarget";

/// Number of colour attachment slots per target
pub const MAX_COLOR_SLOTS: usize = 4;

// ===== SLOT MAP KEY =====

new_key_type! {
    /// Stable key for a FramebufferTarget within a GpuContext.
    pub struct TargetKey;
}

// ===== FRAMEBUFFER TARGET =====

#[derive(Debug, Clone)]
pub struct FramebufferTarget {
    handle: DeviceHandle,
    pub(crate) color: [Option<SurfaceKey>; MAX_COLOR_SLOTS],
    pub(crate) depth: Option<SurfaceKey>,
}

impl FramebufferTarget {
    pub(crate) fn new(handle: DeviceHandle) -> Self {
        Self { handle, color: [None; MAX_COLOR_SLOTS], depth: None }
    }

    pub fn handle(&self) -> DeviceHandle {
        self.handle
    }

    /// Surface in colour `slot` (`None` when empty or out of range)
    pub fn color_slot(&self, slot: usize) -> Option<SurfaceKey> {
        self.color.get(slot).copied().flatten()
    }

    /// Surface in the depth slot
    pub fn depth(&self) -> Option<SurfaceKey> {
        self.depth
    }

    /// Occupied colour slots in ascending order
    pub fn occupied_color_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.color
            .iter()
            .enumerate()
            .filter_map(|(slot, surface)| surface.map(|_| slot))
    }

    pub fn has_attachments(&self) -> bool {
        self.depth.is_some() || self.color.iter().any(Option::is_some)
    }
}

// ============================================================================
// Target lifecycle on the context
// ============================================================================

impl<D: GraphicsDevice> GpuContext<D> {
    /// Allocate an empty framebuffer target
    ///
    /// The new framebuffer has no draw or read buffer selected, so a later
    /// completeness check only sees what gets attached. The default target
    /// is bound afterwards.
    pub fn create_target(&mut self) -> Result<TargetKey> {
        let handle = self
            .device
            .create_framebuffer()
            .map_err(|e| Gpu::log_and_return_error(SOURCE, e))?;

        self.ensure_bound(Some(handle));
        self.device.set_read_buffer(None);
        self.device.set_draw_buffers(&[]);
        self.ensure_bound(None);

        let key = self.targets.insert(FramebufferTarget::new(handle));
        crate::gpu_debug!(SOURCE, "created framebuffer {:?}", handle);
        Ok(key)
    }

    /// Release a target, force-detaching everything attached to it
    ///
    /// Surfaces stay alive with their back-references cleared. If the target
    /// was the bound framebuffer the default target becomes current.
    pub fn free_target(&mut self, key: TargetKey) -> Result<()> {
        let target = self.lookup_target(key)?;
        let depth = target.depth;
        let colors = target.color;

        if let Some(surface) = depth {
            self.detach_surface(surface)?;
        }
        for surface in colors.into_iter().flatten() {
            self.detach_surface(surface)?;
        }

        if let Some(target) = self.targets.remove(key) {
            self.device.delete_framebuffer(target.handle);
            if self.bind_state.is_currently_bound(Some(target.handle)) {
                self.bind_state.restore_default();
            }
            crate::gpu_debug!(SOURCE, "freed framebuffer {:?}", target.handle);
        }
        Ok(())
    }

    /// Check that the device can render to the target
    ///
    /// Leaves the target bound on success. On failure the default target is
    /// bound again and the device's reason is returned.
    pub fn check_complete(&mut self, key: TargetKey) -> Result<()> {
        let handle = self.lookup_target(key)?.handle;
        self.ensure_bound(Some(handle));

        match self.device.framebuffer_status(BindPoint::Framebuffer) {
            FramebufferStatus::Complete => Ok(()),
            FramebufferStatus::Incomplete(reason) => {
                self.restore_default_binding();
                Err(Gpu::log_and_return_error(SOURCE, Error::FramebufferIncomplete(reason)))
            }
        }
    }

    /// Whether the target is the framebuffer currently bound
    pub fn is_target_bound(&self, key: TargetKey) -> bool {
        self.targets
            .get(key)
            .is_some_and(|target| self.bind_state.is_currently_bound(Some(target.handle)))
    }
}

#[cfg(test)]
#[path = "framebuffer_target_tests.rs"]
mod tests;
