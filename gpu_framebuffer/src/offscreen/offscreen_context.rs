/// OffscreenContext - a framebuffer target bundled with its colour and depth surfaces
///
/// Creation is all-or-nothing. Each attachment role is backed either by a
/// sampleable texture or by a renderbuffer, fixed at creation. Multisample
/// requests the device cannot honour end up single-sample instead of failing.

use bitflags::bitflags;
use crate::error::{Error, Result};
use crate::gpu::Gpu;
use crate::context::{GpuContext, TargetScope};
use crate::device::{
    BindPoint, BlitMask, DeviceCapabilities, DeviceHandle, GraphicsDevice, PixelType, ReadbackPixel,
    Rect2D, SurfaceDesc, SurfaceKind, TextureFormat,
};
use crate::framebuffer::TargetKey;
use crate::surface::SurfaceKey;

const SOURCE: &str = "gpufb::OffscreenContext";

/// Format of the depth attachment
const DEPTH_FORMAT: TextureFormat = TextureFormat::D32_FLOAT;

bitflags! {
    /// Backing and sampling options of an offscreen buffer
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OffscreenMode: u32 {
        /// Colour in a renderbuffer instead of a texture
        const RENDERBUFFER_COLOR = 1 << 0;
        /// Depth in a renderbuffer instead of a texture
        const RENDERBUFFER_DEPTH = 1 << 1;
        /// Depth texture sampled with depth comparison
        const DEPTH_COMPARE = 1 << 2;
    }
}

/// Storage behind one attachment role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backing {
    Texture(SurfaceKey),
    Renderbuffer(SurfaceKey),
}

impl Backing {
    pub fn surface(self) -> SurfaceKey {
        match self {
            Backing::Texture(key) | Backing::Renderbuffer(key) => key,
        }
    }

    /// Surface key when texture-backed
    pub fn texture(self) -> Option<SurfaceKey> {
        match self {
            Backing::Texture(key) => Some(key),
            Backing::Renderbuffer(_) => None,
        }
    }
}

/// Sample count actually used for a request
///
/// Multisampling needs multisample renderbuffers, multisample textures
/// unless both roles are renderbuffers, and blits for the readback resolve.
/// Missing any of them means single-sample.
pub fn clamp_samples(capabilities: DeviceCapabilities, samples: u32, mode: OffscreenMode) -> u32 {
    if samples == 0 {
        return 0;
    }
    let renderbuffers_only =
        mode.contains(OffscreenMode::RENDERBUFFER_COLOR | OffscreenMode::RENDERBUFFER_DEPTH);
    let supported = capabilities.contains(DeviceCapabilities::MULTISAMPLE_RENDERBUFFER)
        && (renderbuffers_only || capabilities.contains(DeviceCapabilities::MULTISAMPLE_TEXTURE))
        && capabilities.contains(DeviceCapabilities::FRAMEBUFFER_BLIT);
    if supported { samples } else { 0 }
}

/// Objects allocated so far by a construction that may still fail
#[derive(Default)]
struct Allocations {
    target: Option<TargetKey>,
    surfaces: Vec<SurfaceKey>,
}

impl Allocations {
    /// Free everything, target first so surfaces are detached before release
    fn release<D: GraphicsDevice>(self, ctx: &mut GpuContext<D>) {
        if let Some(target) = self.target {
            if let Err(e) = ctx.free_target(target) {
                crate::gpu_warn!(SOURCE, "leaked framebuffer target during cleanup: {}", e);
            }
        }
        for surface in self.surfaces {
            if let Err(e) = ctx.free_surface(surface) {
                crate::gpu_warn!(SOURCE, "leaked surface during cleanup: {}", e);
            }
        }
    }
}

// ============================================================================
// OffscreenContext
// ============================================================================

#[derive(Debug)]
pub struct OffscreenContext {
    target: TargetKey,
    color: Backing,
    depth: Backing,
    width: u32,
    height: u32,
    samples: u32,
    format: TextureFormat,
}

impl OffscreenContext {
    /// Create a complete offscreen buffer
    ///
    /// # Arguments
    ///
    /// * `ctx` - Context to allocate in
    /// * `width`, `height` - Size in pixels
    /// * `samples` - Requested sample count (0 = single-sample), clamped to
    ///   what the device supports
    /// * `format` - Colour format
    /// * `mode` - Backing of each role and depth-compare sampling
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a depth colour format or zero size, otherwise
    /// whatever allocation, attachment or the completeness check reports.
    /// Everything allocated before the failure is released.
    pub fn create<D: GraphicsDevice>(
        ctx: &mut GpuContext<D>,
        width: u32,
        height: u32,
        samples: u32,
        format: TextureFormat,
        mode: OffscreenMode,
    ) -> Result<Self> {
        if format.is_depth() {
            return Err(Gpu::log_and_return_error(
                SOURCE,
                Error::InvalidArgument(format!("{:?} is not a colour format", format)),
            ));
        }

        let clamped = clamp_samples(ctx.device.capabilities(), samples, mode);
        if clamped != samples {
            crate::gpu_info!(SOURCE, "device cannot multisample offscreen buffers, {} samples requested, using 0", samples);
        }

        let mut allocations = Allocations::default();
        match Self::build(ctx, &mut allocations, width, height, clamped, format, mode) {
            Ok(offscreen) => {
                ctx.restore_default_binding();
                crate::gpu_debug!(SOURCE, "created {}x{} offscreen buffer ({} samples, {:?})", width, height, clamped, mode);
                Ok(offscreen)
            }
            Err(e) => {
                allocations.release(ctx);
                Err(e)
            }
        }
    }

    fn build<D: GraphicsDevice>(
        ctx: &mut GpuContext<D>,
        allocations: &mut Allocations,
        width: u32,
        height: u32,
        samples: u32,
        format: TextureFormat,
        mode: OffscreenMode,
    ) -> Result<Self> {
        let target = ctx.create_target()?;
        allocations.target = Some(target);

        let color_kind = if mode.contains(OffscreenMode::RENDERBUFFER_COLOR) {
            SurfaceKind::Renderbuffer
        } else {
            SurfaceKind::Texture
        };
        let color = Self::create_backing(ctx, allocations, target, width, height, samples, format, color_kind)?;

        let depth_kind = if mode.contains(OffscreenMode::RENDERBUFFER_DEPTH) {
            SurfaceKind::Renderbuffer
        } else {
            SurfaceKind::Texture
        };
        let depth = Self::create_backing(ctx, allocations, target, width, height, samples, DEPTH_FORMAT, depth_kind)?;
        if let Backing::Texture(depth_texture) = depth {
            let handle = ctx.lookup_surface(depth_texture)?.handle();
            ctx.device.set_depth_compare(handle, mode.contains(OffscreenMode::DEPTH_COMPARE));
        }

        ctx.check_complete(target)?;

        Ok(Self { target, color, depth, width, height, samples, format })
    }

    #[allow(clippy::too_many_arguments)]
    fn create_backing<D: GraphicsDevice>(
        ctx: &mut GpuContext<D>,
        allocations: &mut Allocations,
        target: TargetKey,
        width: u32,
        height: u32,
        samples: u32,
        format: TextureFormat,
        kind: SurfaceKind,
    ) -> Result<Backing> {
        let desc = SurfaceDesc { width, height, samples, format, kind };
        let surface = ctx.create_surface(desc)?;
        allocations.surfaces.push(surface);
        ctx.attach_surface(target, surface, 0, 0)?;

        Ok(match kind {
            SurfaceKind::Texture => Backing::Texture(surface),
            SurfaceKind::Renderbuffer => Backing::Renderbuffer(surface),
        })
    }

    // ===== ACCESSORS =====

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sample count in use, after clamping
    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn color(&self) -> Backing {
        self.color
    }

    pub fn depth(&self) -> Backing {
        self.depth
    }

    /// Colour surface when it can be sampled
    pub fn color_texture(&self) -> Option<SurfaceKey> {
        self.color.texture()
    }

    /// Depth surface when it can be sampled
    pub fn depth_texture(&self) -> Option<SurfaceKey> {
        self.depth.texture()
    }

    /// The internal framebuffer target
    pub fn framebuffer(&self) -> TargetKey {
        self.target
    }

    /// Target with its sampleable colour and depth, for viewport drawing code
    pub fn viewport_data(&self) -> (TargetKey, Option<SurfaceKey>, Option<SurfaceKey>) {
        (self.target, self.color_texture(), self.depth_texture())
    }

    // ===== BINDING =====

    /// Bind for rendering
    ///
    /// With `preserve_state` and a texture colour, viewport, scissor and
    /// multisample state are saved and restored when the returned scope ends.
    /// Otherwise slot 0 is bound directly and only the binding is undone.
    /// Either way the scope ends with the default target bound and the
    /// scissor test enabled.
    pub fn bind<'a, D: GraphicsDevice>(
        &self,
        ctx: &'a mut GpuContext<D>,
        preserve_state: bool,
    ) -> Result<TargetScope<'a, D>> {
        if preserve_state {
            if let Some(color) = self.color.texture() {
                return Ok(ctx.bind_surface_as_target(color)?.restoring_default());
            }
        }

        ctx.bind_target_slot(self.target, 0)?;
        let mut scope = TargetScope::unsaved(ctx);
        scope.set_scissor_test(false);
        Ok(scope)
    }

    /// Bind slot 0 without touching the viewport or scissor state
    pub fn bind_simple<D: GraphicsDevice>(&self, ctx: &mut GpuContext<D>) -> Result<()> {
        ctx.bind_target_simple(self.target)
    }

    // ===== READBACK =====

    /// Read the colour attachment as RGBA
    ///
    /// `out` must hold at least `width * height * 4` elements; only that
    /// prefix is written. Multisample texture colour is resolved through a
    /// temporary single-sample target that is always released. The binding
    /// active before the call is active again afterwards.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a short buffer or a multisample renderbuffer
    /// colour, which has no resolve path.
    pub fn read_pixels<D: GraphicsDevice, P: ReadbackPixel>(
        &self,
        ctx: &mut GpuContext<D>,
        out: &mut [P],
    ) -> Result<()> {
        let needed = self.width as usize * self.height as usize * 4;
        if out.len() < needed {
            return Err(Gpu::log_and_return_error(
                SOURCE,
                Error::InvalidArgument(format!("readback buffer holds {} elements, {} needed", out.len(), needed)),
            ));
        }
        if self.samples > 0 && self.color_texture().is_none() {
            return Err(Gpu::log_and_return_error(
                SOURCE,
                Error::InvalidArgument("multisample renderbuffer colour cannot be resolved for readback".to_string()),
            ));
        }

        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut out[..needed]);
        let rect = Rect2D::sized(self.width, self.height);
        let framebuffer = ctx.lookup_target(self.target)?.handle();
        let previous = ctx.bind_state.current();

        let result = if self.samples > 0 {
            let mut scratch = Allocations::default();
            let result = self.resolve_and_read(ctx, &mut scratch, framebuffer, rect, P::PIXEL_TYPE, bytes);
            scratch.release(ctx);
            result
        } else {
            ctx.device.bind_framebuffer(BindPoint::Read, Some(framebuffer));
            ctx.device.set_read_buffer(Some(0));
            ctx.device.read_pixels(rect, P::PIXEL_TYPE, bytes)
        };

        ctx.force_bind(previous);
        result
    }

    fn resolve_and_read<D: GraphicsDevice>(
        &self,
        ctx: &mut GpuContext<D>,
        scratch: &mut Allocations,
        framebuffer: DeviceHandle,
        rect: Rect2D,
        pixel_type: PixelType,
        out: &mut [u8],
    ) -> Result<()> {
        let surface = ctx.create_surface(SurfaceDesc::texture(self.width, self.height, self.format))?;
        scratch.surfaces.push(surface);
        let target = ctx.create_target()?;
        scratch.target = Some(target);
        ctx.attach_surface(target, surface, 0, 0)?;
        ctx.bind_target_simple(target)?;
        ctx.check_complete(target)?;
        let resolved = ctx.lookup_target(target)?.handle();

        ctx.device.bind_framebuffer(BindPoint::Read, Some(framebuffer));
        ctx.device.set_read_buffer(Some(0));
        ctx.device.blit(rect, rect, BlitMask::COLOR)?;

        ctx.device.bind_framebuffer(BindPoint::Read, Some(resolved));
        ctx.device.read_pixels(rect, pixel_type, out)
    }

    // ===== BLIT =====

    /// Copy this buffer into `dst`
    ///
    /// Copies the overlapping rectangle (minimum of both sizes) without
    /// scaling. `dst` is left bound with slot 0 selected, also when the
    /// device blit fails.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when neither colour nor depth is requested.
    pub fn blit<D: GraphicsDevice>(
        &self,
        ctx: &mut GpuContext<D>,
        dst: &OffscreenContext,
        color: bool,
        depth: bool,
    ) -> Result<()> {
        let mut mask = BlitMask::empty();
        mask.set(BlitMask::COLOR, color);
        mask.set(BlitMask::DEPTH, depth);
        if mask.is_empty() {
            return Err(Gpu::log_and_return_error(
                SOURCE,
                Error::InvalidArgument("offscreen blit needs colour or depth".to_string()),
            ));
        }

        let source = ctx.lookup_target(self.target)?.handle();
        let destination = ctx.lookup_target(dst.target)?.handle();
        let rect = Rect2D::sized(self.width.min(dst.width), self.height.min(dst.height));

        ctx.device.bind_framebuffer(BindPoint::Read, Some(source));
        ctx.device.bind_framebuffer(BindPoint::Draw, Some(destination));
        ctx.device.set_draw_buffers(&[0]);
        ctx.device.set_read_buffer(Some(0));
        let result = ctx.device.blit(rect, rect, mask);

        ctx.force_bind(Some(destination));
        ctx.device.set_draw_buffers(&[0]);
        ctx.device.set_read_buffer(Some(0));

        result.map_err(|e| Gpu::log_and_return_error(SOURCE, e))
    }

    // ===== TEARDOWN =====

    /// Release the target, then the colour and depth surfaces
    pub fn free<D: GraphicsDevice>(self, ctx: &mut GpuContext<D>) -> Result<()> {
        ctx.free_target(self.target)?;
        ctx.free_surface(self.color.surface())?;
        ctx.free_surface(self.depth.surface())?;
        crate::gpu_debug!(SOURCE, "freed {}x{} offscreen buffer", self.width, self.height);
        Ok(())
    }
}

#[cfg(test)]
#[path = "offscreen_context_tests.rs"]
mod tests;
