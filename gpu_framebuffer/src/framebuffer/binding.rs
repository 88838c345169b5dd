/// Bind variants for framebuffer targets
///
/// Every variant makes the target the combined read/draw binding and records
/// it. Only `bind_surface_as_target` pushes rasterizer state; the others are
/// undone with `restore_default_binding` or by binding something else.

use crate::error::{Error, Result};
use crate::gpu::Gpu;
use crate::context::{GpuContext, TargetScope};
use crate::device::{GraphicsDevice, Rect2D};
use crate::framebuffer::{TargetKey, MAX_COLOR_SLOTS};
use crate::surface::SurfaceKey;

const SOURCE: &str = "gpufb::FramebufferTarget";

impl<D: GraphicsDevice> GpuContext<D> {
    /// Bind with every occupied colour slot as a draw buffer
    ///
    /// The read buffer is the first occupied slot and the viewport covers the
    /// first colour surface. A depth-only target binds with no draw or read
    /// buffer and a viewport covering the depth surface.
    pub fn bind_target(&mut self, target: TargetKey) -> Result<()> {
        let entry = self.lookup_target(target)?;
        let framebuffer = entry.handle();
        let slots: Vec<usize> = entry.occupied_color_slots().collect();
        let viewport_surface = slots
            .first()
            .and_then(|&slot| entry.color_slot(slot))
            .or(entry.depth());

        let Some(viewport_surface) = viewport_surface else {
            return Err(Gpu::log_and_return_error(
                SOURCE,
                Error::InvalidArgument(format!("framebuffer {:?} has no attachments", framebuffer)),
            ));
        };
        let surface = self.lookup_surface(viewport_surface)?;
        let viewport = Rect2D::sized(surface.width(), surface.height());

        self.ensure_bound(Some(framebuffer));
        self.device.set_draw_buffers(&slots);
        self.device.set_read_buffer(slots.first().copied());
        self.set_viewport(viewport);
        Ok(())
    }

    /// Bind with exactly one colour slot selected for drawing and reading
    ///
    /// # Errors
    ///
    /// `InvalidSlot` for an out-of-range slot and `EmptySlot` when nothing is
    /// attached there. The device is not touched in either case.
    pub fn bind_target_slot(&mut self, target: TargetKey, slot: usize) -> Result<()> {
        if slot >= MAX_COLOR_SLOTS {
            return Err(Gpu::log_and_return_error(
                SOURCE,
                Error::InvalidSlot { slot, max: MAX_COLOR_SLOTS },
            ));
        }
        let entry = self.lookup_target(target)?;
        let framebuffer = entry.handle();
        let Some(surface) = entry.color_slot(slot) else {
            return Err(Gpu::log_and_return_error(SOURCE, Error::EmptySlot(slot)));
        };
        let surface = self.lookup_surface(surface)?;
        let viewport = Rect2D::sized(surface.width(), surface.height());

        self.ensure_bound(Some(framebuffer));
        self.device.set_draw_buffers(&[slot]);
        self.device.set_read_buffer(Some(slot));
        self.set_viewport(viewport);
        Ok(())
    }

    /// Bind the target a surface is attached to, for rendering into that surface
    ///
    /// Saves viewport, scissor and multisample state and returns a guard that
    /// restores it. The scissor test is disabled, draw and read buffers select
    /// the surface's slot (none for a depth surface), multisample
    /// rasterization is enabled for multisample surfaces and the viewport
    /// covers the surface.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the surface is unknown or not attached. No state
    /// is pushed in that case.
    pub fn bind_surface_as_target(&mut self, surface: SurfaceKey) -> Result<TargetScope<'_, D>> {
        let entry = self.lookup_surface(surface)?;
        let Some(placement) = entry.attachment() else {
            return Err(Gpu::log_and_return_error(
                SOURCE,
                Error::InvalidArgument(format!("{:?} is not attached to a framebuffer", entry.handle())),
            ));
        };
        let viewport = Rect2D::sized(entry.width(), entry.height());
        let multisample = entry.samples() > 0;
        let framebuffer = self.lookup_target(placement.target)?.handle();

        let mut scope = TargetScope::save(self);
        scope.set_scissor_test(false);
        scope.ensure_bound(Some(framebuffer));
        match placement.slot() {
            Some(slot) => {
                scope.device.set_draw_buffers(&[slot]);
                scope.device.set_read_buffer(Some(slot));
            }
            None => {
                scope.device.set_draw_buffers(&[]);
                scope.device.set_read_buffer(None);
            }
        }
        if multisample {
            scope.set_multisample(true);
        }
        scope.set_viewport(viewport);
        Ok(scope)
    }

    /// Bind with slot 0 selected, leaving the viewport alone
    pub fn bind_target_simple(&mut self, target: TargetKey) -> Result<()> {
        let framebuffer = self.lookup_target(target)?.handle();
        self.ensure_bound(Some(framebuffer));
        self.device.set_draw_buffers(&[0]);
        self.device.set_read_buffer(Some(0));
        Ok(())
    }

    /// Bind with every occupied colour slot drawn and slot 0 read, leaving
    /// the viewport alone
    pub fn bind_all_attachments(&mut self, target: TargetKey) -> Result<()> {
        let entry = self.lookup_target(target)?;
        let framebuffer = entry.handle();
        let slots: Vec<usize> = entry.occupied_color_slots().collect();

        self.ensure_bound(Some(framebuffer));
        self.device.set_draw_buffers(&slots);
        self.device.set_read_buffer(Some(0));
        Ok(())
    }
}

#[cfg(test)]
#[path = "binding_tests.rs"]
mod tests;
