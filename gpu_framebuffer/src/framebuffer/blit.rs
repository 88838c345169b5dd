/// Copy between two framebuffer targets

use crate::error::{Error, Result};
use crate::gpu::Gpu;
use crate::context::GpuContext;
use crate::device::{BindPoint, BlitMask, DeviceHandle, GraphicsDevice, Rect2D};
use crate::framebuffer::{TargetKey, MAX_COLOR_SLOTS};

const SOURCE: &str = "gpufb::FramebufferTarget";

/// One side of a blit, resolved before the device is touched
struct BlitSide {
    framebuffer: DeviceHandle,
    rect: Rect2D,
}

impl<D: GraphicsDevice> GpuContext<D> {
    /// Copy one attachment of `src` onto one attachment of `dst`
    ///
    /// Each side covers its own surface entirely, so differing sizes stretch
    /// with nearest filtering. `use_depth` copies the depth attachments and
    /// ignores the slots; otherwise the colour slots are copied. The
    /// framebuffer bound before the call is bound again afterwards with
    /// slot 0 drawn, also when the device blit fails.
    pub fn blit_targets(
        &mut self,
        src: TargetKey,
        src_slot: usize,
        dst: TargetKey,
        dst_slot: usize,
        use_depth: bool,
    ) -> Result<()> {
        let read = self.blit_side(src, src_slot, use_depth)?;
        let write = self.blit_side(dst, dst_slot, use_depth)?;
        let mask = if use_depth { BlitMask::DEPTH } else { BlitMask::COLOR };

        self.device.bind_framebuffer(BindPoint::Read, Some(read.framebuffer));
        if !use_depth {
            self.device.set_read_buffer(Some(src_slot));
        }
        self.device.bind_framebuffer(BindPoint::Draw, Some(write.framebuffer));
        if !use_depth {
            self.device.set_draw_buffers(&[dst_slot]);
        }
        let result = self.device.blit(read.rect, write.rect, mask);

        let previous = self.bind_state.current();
        self.force_bind(previous);
        if previous.is_some() {
            self.device.set_draw_buffers(&[0]);
        }

        result.map_err(|e| Gpu::log_and_return_error(SOURCE, e))
    }

    fn blit_side(&self, target: TargetKey, slot: usize, use_depth: bool) -> Result<BlitSide> {
        let entry = self.lookup_target(target)?;
        let surface = if use_depth {
            entry.depth().ok_or_else(|| {
                Gpu::log_and_return_error(
                    SOURCE,
                    Error::InvalidArgument(format!("{:?} has no depth attachment", entry.handle())),
                )
            })?
        } else {
            if slot >= MAX_COLOR_SLOTS {
                return Err(Gpu::log_and_return_error(
                    SOURCE,
                    Error::InvalidSlot { slot, max: MAX_COLOR_SLOTS },
                ));
            }
            entry
                .color_slot(slot)
                .ok_or_else(|| Gpu::log_and_return_error(SOURCE, Error::EmptySlot(slot)))?
        };
        let surface = self.lookup_surface(surface)?;

        Ok(BlitSide {
            framebuffer: entry.handle(),
            rect: Rect2D::sized(surface.width(), surface.height()),
        })
    }
}

#[cfg(test)]
#[path = "blit_tests.rs"]
mod tests;
