/// Two-pass separable gaussian blur between two framebuffer targets

use glam::Vec2;
use crate::error::{Error, Result};
use crate::gpu::Gpu;
use crate::context::GpuContext;
use crate::device::{BuiltinShader, DeviceHandle, GraphicsDevice, QuadRasterizer, Rect2D};
use crate::framebuffer::TargetKey;
use crate::surface::SurfaceKey;

const SOURCE: &str = "gpufb::Blur";

/// Target and texture of one blur pass, resolved up front
struct BlurPass {
    framebuffer: DeviceHandle,
    texture: SurfaceKey,
    width: u32,
    height: u32,
}

impl<D: GraphicsDevice> GpuContext<D> {
    /// Blur `surface` in place, using `blur_surface` as intermediate
    ///
    /// The horizontal pass samples `surface` into `blur_target`, the vertical
    /// pass samples `blur_surface` back into `target`. Both passes draw slot 0
    /// over the whole destination with the depth test disabled. `sharpness`
    /// of 1 gives a zero-width kernel, lower values widen it.
    ///
    /// `target` is left bound afterwards and texture unit 0 is cleared.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for unknown keys or renderbuffer surfaces, and any
    /// error the rasterizer reports.
    pub fn blur(
        &mut self,
        rasterizer: &mut dyn QuadRasterizer,
        target: TargetKey,
        surface: SurfaceKey,
        blur_target: TargetKey,
        blur_surface: SurfaceKey,
        sharpness: f32,
    ) -> Result<()> {
        let vertical = self.blur_pass(target, surface)?;
        let horizontal = self.blur_pass(blur_target, blur_surface)?;

        let scale_h = Vec2::new((1.0 - sharpness) / horizontal.width as f32, 0.0);
        let scale_v = Vec2::new(0.0, (1.0 - sharpness) / vertical.height as f32);

        self.device.set_depth_test(false);

        // Horizontal: surface -> blur surface
        self.blur_draw(rasterizer, &horizontal, vertical.texture, scale_h)?;
        // Vertical: blur surface -> surface
        self.blur_draw(rasterizer, &vertical, horizontal.texture, scale_v)?;

        crate::gpu_trace!(SOURCE, "blurred {:?} (sharpness {})", vertical.framebuffer, sharpness);
        Ok(())
    }

    fn blur_pass(&self, target: TargetKey, surface: SurfaceKey) -> Result<BlurPass> {
        let framebuffer = self.lookup_target(target)?.handle();
        let texture = self.lookup_surface(surface)?;
        if !texture.is_texture() {
            return Err(Gpu::log_and_return_error(
                SOURCE,
                Error::InvalidArgument(format!("renderbuffer {:?} cannot be blurred", texture.handle())),
            ));
        }
        Ok(BlurPass {
            framebuffer,
            texture: surface,
            width: texture.width(),
            height: texture.height(),
        })
    }

    fn blur_draw(
        &mut self,
        rasterizer: &mut dyn QuadRasterizer,
        pass: &BlurPass,
        source: SurfaceKey,
        scale: Vec2,
    ) -> Result<()> {
        self.ensure_bound(Some(pass.framebuffer));
        self.device.set_draw_buffers(&[0]);
        self.set_viewport(Rect2D::sized(pass.width, pass.height));

        self.bind_surface_texture(source, 0)?;
        let result = rasterizer.draw_fullscreen_quad(
            &mut self.device,
            BuiltinShader::SeparableGaussianBlur,
            scale,
        );
        self.unbind_texture_unit(0);

        result.map_err(|e| Gpu::log_and_return_error(SOURCE, e))
    }
}

#[cfg(test)]
#[path = "blur_tests.rs"]
mod tests;
