/// RenderSurface - a device image that can be attached to a framebuffer
///
/// Surfaces live in the context's arena and are addressed by `SurfaceKey`.
/// The attachment back-reference is lookup-only: the target owns the forward
/// slot entry, the surface only remembers where it sits so detach can find it.

use slotmap::new_key_type;
use crate::error::{Error, Result};
use crate::gpu::Gpu;
use crate::context::GpuContext;
use crate::device::{
    AttachmentPoint, DeviceHandle, GraphicsDevice, ImageRef, SurfaceDesc, SurfaceKind,
    TextureFormat,
};
use crate::framebuffer::TargetKey;

const SOURCE: &str = "gpufb::RenderSurface";

// ===== SLOT MAP KEY =====

new_key_type! {
    /// Stable key for a RenderSurface within a GpuContext.
    pub struct SurfaceKey;
}

// ===== ATTACHMENT BACK-REFERENCE =====

/// Where a surface is currently attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceAttachment {
    pub target: TargetKey,
    pub point: AttachmentPoint,
}

impl SurfaceAttachment {
    /// Colour slot index, `None` for the depth role
    pub fn slot(&self) -> Option<usize> {
        match self.point {
            AttachmentPoint::Color(slot) => Some(slot),
            _ => None,
        }
    }
}

// ===== RENDER SURFACE =====

#[derive(Debug, Clone)]
pub struct RenderSurface {
    handle: DeviceHandle,
    desc: SurfaceDesc,
    pub(crate) attachment: Option<SurfaceAttachment>,
}

impl RenderSurface {
    pub(crate) fn new(handle: DeviceHandle, desc: SurfaceDesc) -> Self {
        Self { handle, desc, attachment: None }
    }

    pub fn handle(&self) -> DeviceHandle {
        self.handle
    }

    pub fn desc(&self) -> &SurfaceDesc {
        &self.desc
    }

    pub fn width(&self) -> u32 {
        self.desc.width
    }

    pub fn height(&self) -> u32 {
        self.desc.height
    }

    /// Sample count, 0 when single-sample
    pub fn samples(&self) -> u32 {
        self.desc.samples
    }

    pub fn format(&self) -> TextureFormat {
        self.desc.format
    }

    pub fn kind(&self) -> SurfaceKind {
        self.desc.kind
    }

    pub fn is_depth(&self) -> bool {
        self.desc.format.is_depth()
    }

    pub fn has_stencil(&self) -> bool {
        self.desc.format.has_stencil()
    }

    pub fn is_texture(&self) -> bool {
        self.desc.kind == SurfaceKind::Texture
    }

    /// Target and role this surface is attached to, if any
    pub fn attachment(&self) -> Option<SurfaceAttachment> {
        self.attachment
    }

    /// Device reference used for attach and delete calls
    pub fn image_ref(&self) -> ImageRef {
        match self.desc.kind {
            SurfaceKind::Texture => ImageRef::Texture(self.handle),
            SurfaceKind::Renderbuffer => ImageRef::Renderbuffer(self.handle),
        }
    }

    /// Attachment role this surface takes when attached at colour `slot`
    ///
    /// Depth-stencil formats select the combined point, plain depth formats
    /// the depth point, anything else the colour slot.
    pub fn attachment_point(&self, slot: usize) -> AttachmentPoint {
        if self.has_stencil() {
            AttachmentPoint::DepthStencil
        } else if self.is_depth() {
            AttachmentPoint::Depth
        } else {
            AttachmentPoint::Color(slot)
        }
    }
}

// ============================================================================
// Surface operations on the context
// ============================================================================

impl<D: GraphicsDevice> GpuContext<D> {
    /// Allocate a texture or renderbuffer surface
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero-sized descriptor, `ResourceCreation`
    /// when the device refuses the allocation.
    pub fn create_surface(&mut self, desc: SurfaceDesc) -> Result<SurfaceKey> {
        if desc.width == 0 || desc.height == 0 {
            return Err(Gpu::log_and_return_error(
                SOURCE,
                Error::InvalidArgument(format!("surface size {}x{}", desc.width, desc.height)),
            ));
        }

        let handle = self
            .device
            .create_image(&desc)
            .map_err(|e| Gpu::log_and_return_error(SOURCE, e))?;
        let key = self.surfaces.insert(RenderSurface::new(handle, desc));

        crate::gpu_debug!(
            SOURCE,
            "created {:?} {}x{} {:?} ({} samples) as {:?}",
            desc.kind, desc.width, desc.height, desc.format, desc.samples, handle
        );
        Ok(key)
    }

    /// Release a surface, detaching it from its target first
    pub fn free_surface(&mut self, key: SurfaceKey) -> Result<()> {
        let attached = self.lookup_surface(key)?.attachment.is_some();
        if attached {
            self.detach_surface(key)?;
        }

        if let Some(surface) = self.surfaces.remove(key) {
            self.device.delete_image(surface.image_ref());
            crate::gpu_debug!(SOURCE, "freed surface {:?}", surface.handle);
        }
        Ok(())
    }

    /// Bind a texture surface to a sampler unit for reading
    pub fn bind_surface_texture(&mut self, key: SurfaceKey, unit: u32) -> Result<()> {
        let surface = self.lookup_surface(key)?;
        if !surface.is_texture() {
            return Err(Gpu::log_and_return_error(
                SOURCE,
                Error::InvalidArgument(format!("renderbuffer {:?} cannot be sampled", surface.handle)),
            ));
        }
        let handle = surface.handle;
        self.device.bind_texture(unit, Some(handle));
        Ok(())
    }

    /// Clear a sampler unit
    pub fn unbind_texture_unit(&mut self, unit: u32) {
        self.device.bind_texture(unit, None);
    }

    /// Sampler unit the surface is bound to for reading, if any
    pub fn sampled_unit(&self, key: SurfaceKey) -> Option<u32> {
        let surface = self.surfaces.get(key)?;
        if !surface.is_texture() {
            return None;
        }
        self.device.texture_unit(surface.handle)
    }
}

#[cfg(test)]
#[path = "render_surface_tests.rs"]
mod tests;
