/// GraphicsDevice trait - the contract a graphics backend binding must satisfy
///
/// The framebuffer layer never talks to a graphics API directly. Everything
/// it needs from the device goes through this trait: handle allocation,
/// attachment, buffer selection, completeness queries, blits and readback.

use std::num::NonZeroU32;
use bitflags::bitflags;
use crate::error::{IncompleteReason, Result};
use crate::device::SurfaceDesc;

// ============================================================================
// Value types
// ============================================================================

/// Device-side object name (framebuffer, texture or renderbuffer)
///
/// Zero is reserved for "no object" and cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceHandle(NonZeroU32);

impl DeviceHandle {
    /// Wrap a raw device name, `None` for zero
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// Raw device name
    pub fn raw(self) -> u32 {
        self.0.get()
    }
}

bitflags! {
    /// Optional device features the framebuffer layer adapts to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DeviceCapabilities: u32 {
        /// Multisample storage for renderbuffers
        const MULTISAMPLE_RENDERBUFFER = 1 << 0;
        /// Multisample storage for textures
        const MULTISAMPLE_TEXTURE = 1 << 1;
        /// Framebuffer-to-framebuffer blits (needed to resolve multisampling)
        const FRAMEBUFFER_BLIT = 1 << 2;
    }
}

bitflags! {
    /// Buffers copied by a blit
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BlitMask: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
    }
}

/// Framebuffer binding point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindPoint {
    /// Read and draw at once
    Framebuffer,
    /// Source of blits and readback
    Read,
    /// Destination of draws and blits
    Draw,
}

/// Where an image is attached on a framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentPoint {
    /// Numbered color output
    Color(usize),
    /// Depth only
    Depth,
    /// Combined depth + stencil
    DepthStencil,
}

impl AttachmentPoint {
    /// Whether this is the depth (or depth-stencil) role
    pub fn is_depth(self) -> bool {
        !matches!(self, AttachmentPoint::Color(_))
    }
}

/// Image handed to the device for attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageRef {
    Texture(DeviceHandle),
    Renderbuffer(DeviceHandle),
}

impl ImageRef {
    /// Underlying device handle
    pub fn handle(self) -> DeviceHandle {
        match self {
            ImageRef::Texture(handle) | ImageRef::Renderbuffer(handle) => handle,
        }
    }
}

/// Integer rectangle in framebuffer pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    /// Rectangle anchored at the origin
    pub fn sized(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

/// Result of a completeness query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferStatus {
    Complete,
    Incomplete(IncompleteReason),
}

/// Component type of pixels read back from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    /// One byte per channel
    UnsignedByte,
    /// One 32-bit float per channel, normalized to [0, 1]
    Float,
}

impl PixelType {
    /// Bytes per channel
    pub fn size(self) -> usize {
        match self {
            PixelType::UnsignedByte => 1,
            PixelType::Float => 4,
        }
    }
}

/// Element type accepted by pixel readback
pub trait ReadbackPixel: bytemuck::Pod {
    /// Device pixel type this element maps to
    const PIXEL_TYPE: PixelType;
}

impl ReadbackPixel for u8 {
    const PIXEL_TYPE: PixelType = PixelType::UnsignedByte;
}

impl ReadbackPixel for f32 {
    const PIXEL_TYPE: PixelType = PixelType::Float;
}

// ============================================================================
// GraphicsDevice trait
// ============================================================================

/// Graphics device binding
///
/// One instance corresponds to one graphics context and must only be used
/// from the thread that owns that context. Attachment, buffer selection and
/// completeness calls apply to whatever framebuffer is bound at the relevant
/// point, like the underlying APIs do.
pub trait GraphicsDevice {
    /// Optional features supported by this device
    fn capabilities(&self) -> DeviceCapabilities;

    /// Allocate an empty framebuffer object
    fn create_framebuffer(&mut self) -> Result<DeviceHandle>;

    /// Release a framebuffer object
    fn delete_framebuffer(&mut self, framebuffer: DeviceHandle);

    /// Allocate a texture or renderbuffer with reserved storage
    fn create_image(&mut self, desc: &SurfaceDesc) -> Result<DeviceHandle>;

    /// Release a texture or renderbuffer
    fn delete_image(&mut self, image: ImageRef);

    /// Bind a framebuffer (or the default target with `None`)
    fn bind_framebuffer(&mut self, point: BindPoint, framebuffer: Option<DeviceHandle>);

    /// Framebuffer currently bound at `point`
    fn bound_framebuffer(&self, point: BindPoint) -> Option<DeviceHandle>;

    /// Attach an image to the framebuffer bound for drawing
    fn attach_image(&mut self, point: AttachmentPoint, image: ImageRef, mip_level: u32) -> Result<()>;

    /// Clear an attachment of the framebuffer bound for drawing
    fn detach_image(&mut self, point: AttachmentPoint);

    /// Select the color slots written by draws (empty = none)
    fn set_draw_buffers(&mut self, slots: &[usize]);

    /// Select the color slot used by reads and blits (`None` = none)
    fn set_read_buffer(&mut self, slot: Option<usize>);

    /// Set the rasterization viewport
    fn set_viewport(&mut self, viewport: Rect2D);

    /// Current viewport
    fn viewport(&self) -> Rect2D;

    /// Enable or disable the scissor test
    fn set_scissor_test(&mut self, enabled: bool);

    /// Enable or disable multisample rasterization
    fn set_multisample(&mut self, enabled: bool);

    /// Enable or disable the depth test
    fn set_depth_test(&mut self, enabled: bool);

    /// Completeness of the framebuffer bound at `point`
    fn framebuffer_status(&self, point: BindPoint) -> FramebufferStatus;

    /// Copy a rectangle from the read framebuffer to the draw framebuffer
    /// with nearest filtering, scaling `src` onto `dst`
    fn blit(&mut self, src: Rect2D, dst: Rect2D, mask: BlitMask) -> Result<()>;

    /// Read an RGBA rectangle of the read framebuffer into `out`
    fn read_pixels(&mut self, rect: Rect2D, pixel_type: PixelType, out: &mut [u8]) -> Result<()>;

    /// Bind a texture to a sampler unit (`None` unbinds the unit)
    fn bind_texture(&mut self, unit: u32, texture: Option<DeviceHandle>);

    /// Texture currently bound to a sampler unit
    fn bound_texture(&self, unit: u32) -> Option<DeviceHandle>;

    /// Sampler unit a texture is currently bound to, if any
    fn texture_unit(&self, texture: DeviceHandle) -> Option<u32>;

    /// Toggle depth-compare sampling on a depth texture
    fn set_depth_compare(&mut self, texture: DeviceHandle, enabled: bool);
}
