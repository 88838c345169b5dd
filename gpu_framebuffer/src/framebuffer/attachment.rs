/// Attach and detach surfaces on framebuffer targets
///
/// Both operations keep the target's slot entry and the surface's
/// back-reference in agreement: a surface sits in at most one slot of one
/// target, and a slot holds at most one surface.

use crate::error::{Error, Result};
use crate::gpu::Gpu;
use crate::context::GpuContext;
use crate::device::{AttachmentPoint, GraphicsDevice};
use crate::framebuffer::{TargetKey, MAX_COLOR_SLOTS};
use crate::surface::{SurfaceAttachment, SurfaceKey};

const SOURCE: &str = "gpufb::FramebufferTarget";

impl<D: GraphicsDevice> GpuContext<D> {
    /// Attach `surface` to `target`
    ///
    /// The role comes from the surface format: depth-stencil formats go to the
    /// combined depth-stencil point, depth formats to the depth point, colour
    /// formats to colour `slot`. A surface attached elsewhere is moved, and
    /// whatever occupied the role before is detached. The target stays bound.
    ///
    /// # Arguments
    ///
    /// * `target` - Framebuffer target to attach to
    /// * `surface` - Surface to attach
    /// * `slot` - Colour slot (checked even for depth surfaces)
    /// * `mip_level` - Texture mip level to render into (0 for renderbuffers)
    ///
    /// # Errors
    ///
    /// `InvalidSlot` when `slot >= MAX_COLOR_SLOTS`, `InvalidArgument` for
    /// unknown keys or a non-zero renderbuffer mip level. Nothing changes in
    /// those cases. When the device refuses the attach, existing attachments
    /// are kept and the default target is bound again.
    pub fn attach_surface(
        &mut self,
        target: TargetKey,
        surface: SurfaceKey,
        slot: usize,
        mip_level: u32,
    ) -> Result<()> {
        if slot >= MAX_COLOR_SLOTS {
            return Err(Gpu::log_and_return_error(
                SOURCE,
                Error::InvalidSlot { slot, max: MAX_COLOR_SLOTS },
            ));
        }

        let framebuffer = self.lookup_target(target)?.handle();
        let attaching = self.lookup_surface(surface)?;
        if !attaching.is_texture() && mip_level != 0 {
            return Err(Gpu::log_and_return_error(
                SOURCE,
                Error::InvalidArgument(format!("renderbuffers have no mip level {}", mip_level)),
            ));
        }
        let point = attaching.attachment_point(slot);
        let image = attaching.image_ref();
        let placement = SurfaceAttachment { target, point };
        let previous = attaching.attachment;

        if self.config.enable_validation {
            if let Some(unit) = self.sampled_unit(surface) {
                crate::gpu_warn!(
                    SOURCE,
                    "feedback loop: {:?} is attached while bound for reading on unit {}",
                    image.handle(),
                    unit
                );
            }
        }

        let occupant = match point {
            AttachmentPoint::Color(slot) => self.targets[target].color[slot],
            _ => self.targets[target].depth,
        }
        .filter(|occupant| *occupant != surface);

        self.ensure_bound(Some(framebuffer));
        if let Err(e) = self.device.attach_image(point, image, mip_level) {
            self.restore_default_binding();
            return Err(Gpu::log_and_return_error(SOURCE, e));
        }

        // The device attach replaced the occupant, only its back-reference is left
        if let Some(occupant) = occupant {
            self.surfaces[occupant].attachment = None;
        }
        if previous.is_some_and(|previous| previous != placement) {
            self.detach_surface(surface)?;
            self.ensure_bound(Some(framebuffer));
        }

        let target_entry = &mut self.targets[target];
        match point {
            AttachmentPoint::Color(slot) => target_entry.color[slot] = Some(surface),
            _ => target_entry.depth = Some(surface),
        }
        self.surfaces[surface].attachment = Some(placement);

        crate::gpu_trace!(SOURCE, "attached {:?} to {:?} at {:?}", image.handle(), framebuffer, point);
        Ok(())
    }

    /// Detach `surface` from the target it is attached to
    ///
    /// No-op for a surface that is not attached. The target is bound only if
    /// it is not already current.
    pub fn detach_surface(&mut self, surface: SurfaceKey) -> Result<()> {
        let Some(placement) = self.lookup_surface(surface)?.attachment else {
            return Ok(());
        };

        if let Some(target) = self.targets.get(placement.target) {
            let framebuffer = target.handle();
            self.ensure_bound(Some(framebuffer));
            self.device.detach_image(placement.point);

            let target_entry = &mut self.targets[placement.target];
            match placement.point {
                AttachmentPoint::Color(slot) => target_entry.color[slot] = None,
                _ => target_entry.depth = None,
            }
            crate::gpu_trace!(SOURCE, "detached {:?} from {:?}", placement.point, framebuffer);
        }

        self.surfaces[surface].attachment = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "attachment_tests.rs"]
mod tests;
