/// Mock graphics device (no GPU required)
///
/// Keeps every framebuffer and image in memory and implements the device
/// contract for real: attachments are tracked per framebuffer, completeness
/// is evaluated from them, blits copy pixels with nearest filtering and
/// readback refuses multisample sources the way hardware does. Used by the
/// test suites and usable as a headless backend.

use rustc_hash::FxHashMap;
use glam::Vec2;

use crate::error::{Error, IncompleteReason, Result};
use crate::device::{
    AttachmentPoint, BindPoint, BlitMask, BuiltinShader, DeviceCapabilities, DeviceHandle,
    FramebufferStatus, GraphicsDevice, ImageRef, PixelType, QuadRasterizer, Rect2D,
    SurfaceDesc, SurfaceKind,
};
use crate::{gpu_bail, gpu_err};

/// Color attachment points exposed by the mock (more than the layer uses)
pub const MOCK_MAX_COLOR_ATTACHMENTS: usize = 8;

const SOURCE: &str = "gpufb::mock";

// ============================================================================
// Mock objects
// ============================================================================

/// Image storage (texture or renderbuffer), one RGBA8 value per pixel
#[derive(Debug, Clone)]
pub struct MockImage {
    pub desc: SurfaceDesc,
    pub pixels: Vec<[u8; 4]>,
    pub depth_compare: bool,
}

impl MockImage {
    fn new(desc: SurfaceDesc) -> Self {
        Self { desc, pixels: vec![[0; 4]; desc.pixel_count()], depth_compare: false }
    }

    fn pixel(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        if x < 0 || y < 0 || x as u32 >= self.desc.width || y as u32 >= self.desc.height {
            return None;
        }
        self.pixels.get(y as usize * self.desc.width as usize + x as usize).copied()
    }

    fn set_pixel(&mut self, x: i32, y: i32, value: [u8; 4]) {
        if x < 0 || y < 0 || x as u32 >= self.desc.width || y as u32 >= self.desc.height {
            return;
        }
        let index = y as usize * self.desc.width as usize + x as usize;
        self.pixels[index] = value;
    }
}

/// One attachment of a mock framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockAttachment {
    pub image: ImageRef,
    pub mip_level: u32,
}

/// Framebuffer object state
#[derive(Debug, Clone, Default)]
pub struct MockFramebuffer {
    pub color: [Option<MockAttachment>; MOCK_MAX_COLOR_ATTACHMENTS],
    /// Depth or depth-stencil attachment with the point it was attached at
    pub depth: Option<(AttachmentPoint, MockAttachment)>,
    pub draw_buffers: Vec<usize>,
    pub read_buffer: Option<usize>,
}

impl MockFramebuffer {
    fn has_attachments(&self) -> bool {
        self.depth.is_some() || self.color.iter().any(Option::is_some)
    }

    fn attachments(&self) -> impl Iterator<Item = (AttachmentPoint, MockAttachment)> + '_ {
        self.color
            .iter()
            .enumerate()
            .filter_map(|(slot, att)| att.map(|att| (AttachmentPoint::Color(slot), att)))
            .chain(self.depth)
    }
}

/// Failure injection switches
#[derive(Debug, Clone, Default)]
pub struct MockFailures {
    /// Every framebuffer allocation fails
    pub framebuffer_creation: bool,
    /// Number of images that may still be created before allocation fails
    pub image_budget: Option<usize>,
    /// Every attach call fails
    pub attach: bool,
    /// Completeness queries report this reason whatever the attachments
    pub forced_status: Option<IncompleteReason>,
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

/// In-memory graphics device
#[derive(Debug)]
pub struct MockGraphicsDevice {
    pub capabilities: DeviceCapabilities,
    pub failures: MockFailures,
    /// Name of every device call, in order
    pub calls: Vec<String>,
    /// Framebuffers ever created
    pub framebuffers_created: usize,
    /// Images ever created
    pub images_created: usize,
    next_handle: u32,
    framebuffers: FxHashMap<DeviceHandle, MockFramebuffer>,
    images: FxHashMap<DeviceHandle, MockImage>,
    read_binding: Option<DeviceHandle>,
    draw_binding: Option<DeviceHandle>,
    viewport: Rect2D,
    scissor_test: bool,
    multisample: bool,
    depth_test: bool,
    texture_units: FxHashMap<u32, DeviceHandle>,
}

impl MockGraphicsDevice {
    /// Device supporting every optional feature
    pub fn new() -> Self {
        Self::with_capabilities(DeviceCapabilities::all())
    }

    /// Device restricted to `capabilities`
    pub fn with_capabilities(capabilities: DeviceCapabilities) -> Self {
        Self {
            capabilities,
            failures: MockFailures::default(),
            calls: Vec::new(),
            framebuffers_created: 0,
            images_created: 0,
            next_handle: 1,
            framebuffers: FxHashMap::default(),
            images: FxHashMap::default(),
            read_binding: None,
            draw_binding: None,
            viewport: Rect2D::default(),
            scissor_test: true,
            multisample: false,
            depth_test: true,
            texture_units: FxHashMap::default(),
        }
    }

    // ===== INSPECTION =====

    /// Framebuffer state by handle
    pub fn framebuffer(&self, handle: DeviceHandle) -> Option<&MockFramebuffer> {
        self.framebuffers.get(&handle)
    }

    /// Image state by handle
    pub fn image(&self, handle: DeviceHandle) -> Option<&MockImage> {
        self.images.get(&handle)
    }

    /// Framebuffers currently alive
    pub fn live_framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    /// Images currently alive
    pub fn live_image_count(&self) -> usize {
        self.images.len()
    }

    /// Image attached at `point` of `framebuffer`
    pub fn attachment(&self, framebuffer: DeviceHandle, point: AttachmentPoint) -> Option<ImageRef> {
        let fb = self.framebuffers.get(&framebuffer)?;
        match point {
            AttachmentPoint::Color(slot) => fb.color.get(slot).copied().flatten().map(|att| att.image),
            depth_point => fb.depth.filter(|(p, _)| *p == depth_point).map(|(_, att)| att.image),
        }
    }

    pub fn scissor_test(&self) -> bool {
        self.scissor_test
    }

    pub fn multisample(&self) -> bool {
        self.multisample
    }

    pub fn depth_test(&self) -> bool {
        self.depth_test
    }

    /// Number of recorded calls named `name`
    pub fn call_count(&self, name: &str) -> usize {
        self.calls.iter().filter(|call| call.as_str() == name).count()
    }

    // ===== PIXEL ACCESS =====

    /// Fill a whole image with one value. Returns false for unknown handles.
    pub fn fill_image(&mut self, handle: DeviceHandle, value: [u8; 4]) -> bool {
        match self.images.get_mut(&handle) {
            Some(image) => {
                image.pixels.iter_mut().for_each(|pixel| *pixel = value);
                true
            }
            None => false,
        }
    }

    /// Write one pixel of an image
    pub fn set_pixel(&mut self, handle: DeviceHandle, x: u32, y: u32, value: [u8; 4]) {
        if let Some(image) = self.images.get_mut(&handle) {
            image.set_pixel(x as i32, y as i32, value);
        }
    }

    /// Read one pixel of an image
    pub fn pixel(&self, handle: DeviceHandle, x: u32, y: u32) -> Option<[u8; 4]> {
        self.images.get(&handle)?.pixel(x as i32, y as i32)
    }

    // ===== INTERNALS =====

    fn record(&mut self, call: &str) {
        self.calls.push(call.to_string());
    }

    fn allocate_handle(&mut self) -> Result<DeviceHandle> {
        let handle = DeviceHandle::new(self.next_handle)
            .ok_or_else(|| Error::ResourceCreation("device handle space exhausted".to_string()))?;
        self.next_handle += 1;
        Ok(handle)
    }

    fn binding(&self, point: BindPoint) -> Option<DeviceHandle> {
        match point {
            BindPoint::Framebuffer | BindPoint::Draw => self.draw_binding,
            BindPoint::Read => self.read_binding,
        }
    }

    fn bound_framebuffer_mut(&mut self, point: BindPoint) -> Result<&mut MockFramebuffer> {
        let handle = self
            .binding(point)
            .ok_or_else(|| gpu_err!(SOURCE, "no framebuffer bound at {:?}", point))?;
        self.framebuffers
            .get_mut(&handle)
            .ok_or_else(|| gpu_err!(SOURCE, "bound framebuffer {:?} does not exist", handle))
    }

    fn image_for(&self, attachment: MockAttachment) -> Result<&MockImage> {
        self.images
            .get(&attachment.image.handle())
            .ok_or_else(|| gpu_err!(SOURCE, "attached image {:?} no longer exists", attachment.image))
    }

    fn evaluate_status(&self, framebuffer: &MockFramebuffer) -> FramebufferStatus {
        if !framebuffer.has_attachments() {
            return FramebufferStatus::Incomplete(IncompleteReason::MissingAttachment);
        }

        let mut samples = None;
        for (point, attachment) in framebuffer.attachments() {
            let Some(image) = self.images.get(&attachment.image.handle()) else {
                return FramebufferStatus::Incomplete(IncompleteReason::IncompleteAttachment);
            };
            let format = image.desc.format;
            let role_matches = match point {
                AttachmentPoint::Color(_) => !format.is_depth(),
                AttachmentPoint::Depth => format.is_depth(),
                AttachmentPoint::DepthStencil => format.has_stencil(),
            };
            if !role_matches || image.desc.width == 0 || image.desc.height == 0 {
                return FramebufferStatus::Incomplete(IncompleteReason::IncompleteAttachment);
            }
            match samples {
                None => samples = Some(image.desc.samples),
                Some(count) if count != image.desc.samples => {
                    return FramebufferStatus::Incomplete(IncompleteReason::IncompleteMultisample);
                }
                Some(_) => {}
            }
        }

        let slot_empty = |slot: usize| framebuffer.color.get(slot).copied().flatten().is_none();
        if framebuffer.draw_buffers.iter().any(|&slot| slot_empty(slot)) {
            return FramebufferStatus::Incomplete(IncompleteReason::IncompleteDrawBuffer);
        }
        if framebuffer.read_buffer.is_some_and(slot_empty) {
            return FramebufferStatus::Incomplete(IncompleteReason::IncompleteReadBuffer);
        }

        FramebufferStatus::Complete
    }

    fn source_attachment(&self, mask: BlitMask) -> Result<MockAttachment> {
        let handle = self
            .read_binding
            .ok_or_else(|| gpu_err!(SOURCE, "blit source is the default framebuffer"))?;
        let fb = self
            .framebuffers
            .get(&handle)
            .ok_or_else(|| gpu_err!(SOURCE, "blit source {:?} does not exist", handle))?;
        if mask == BlitMask::DEPTH {
            return fb.depth.map(|(_, att)| att).ok_or_else(|| {
                gpu_err!(SOURCE, "blit source {:?} has no depth attachment", handle)
            });
        }
        fb.read_buffer
            .and_then(|slot| fb.color.get(slot).copied().flatten())
            .ok_or_else(|| gpu_err!(SOURCE, "blit source {:?} has no read buffer", handle))
    }

    fn destination_attachments(&self, mask: BlitMask) -> Result<Vec<MockAttachment>> {
        let handle = self
            .draw_binding
            .ok_or_else(|| gpu_err!(SOURCE, "blit destination is the default framebuffer"))?;
        let fb = self
            .framebuffers
            .get(&handle)
            .ok_or_else(|| gpu_err!(SOURCE, "blit destination {:?} does not exist", handle))?;
        if mask == BlitMask::DEPTH {
            return Ok(fb.depth.map(|(_, att)| att).into_iter().collect());
        }
        Ok(fb
            .draw_buffers
            .iter()
            .filter_map(|&slot| fb.color.get(slot).copied().flatten())
            .collect())
    }

    fn blit_one(&mut self, src: Rect2D, dst: Rect2D, mask: BlitMask) -> Result<()> {
        let source = self.source_attachment(mask)?;
        let source_image = self.image_for(source)?.clone();
        let destinations = self.destination_attachments(mask)?;

        if source_image.desc.samples > 0 && (src.width != dst.width || src.height != dst.height) {
            return Err(gpu_err!(SOURCE, "multisample blit source must not be scaled"));
        }

        for destination in destinations {
            let handle = destination.image.handle();
            let image = self
                .images
                .get_mut(&handle)
                .ok_or_else(|| gpu_err!(SOURCE, "blit destination image {:?} is gone", handle))?;
            if image.desc.samples > 0 {
                if image.desc.samples != source_image.desc.samples {
                    return Err(gpu_err!(
                        SOURCE,
                        "multisample blit between {} and {} samples",
                        source_image.desc.samples,
                        image.desc.samples
                    ));
                }
                if src.width != dst.width || src.height != dst.height {
                    return Err(gpu_err!(SOURCE, "multisample blit destination must not be scaled"));
                }
            }
            if mask == BlitMask::DEPTH && image.desc.format != source_image.desc.format {
                return Err(gpu_err!(SOURCE, "depth blit between mismatched formats"));
            }
            copy_nearest(&source_image, src, image, dst);
        }
        Ok(())
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

/// Nearest-neighbour scaled copy, sampling at destination pixel centres
fn copy_nearest(source: &MockImage, src: Rect2D, destination: &mut MockImage, dst: Rect2D) {
    if dst.width == 0 || dst.height == 0 {
        return;
    }
    for dy in 0..dst.height {
        let sy = src.y + ((2 * dy as u64 + 1) * src.height as u64 / (2 * dst.height as u64)) as i32;
        for dx in 0..dst.width {
            let sx = src.x + ((2 * dx as u64 + 1) * src.width as u64 / (2 * dst.width as u64)) as i32;
            if let Some(value) = source.pixel(sx, sy) {
                destination.set_pixel(dst.x + dx as i32, dst.y + dy as i32, value);
            }
        }
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn create_framebuffer(&mut self) -> Result<DeviceHandle> {
        self.record("create_framebuffer");
        if self.failures.framebuffer_creation {
            return Err(Error::ResourceCreation("framebuffer gen failed".to_string()));
        }
        let handle = self.allocate_handle()?;
        self.framebuffers.insert(handle, MockFramebuffer::default());
        self.framebuffers_created += 1;
        Ok(handle)
    }

    fn delete_framebuffer(&mut self, framebuffer: DeviceHandle) {
        self.record("delete_framebuffer");
        self.framebuffers.remove(&framebuffer);
        if self.read_binding == Some(framebuffer) {
            self.read_binding = None;
        }
        if self.draw_binding == Some(framebuffer) {
            self.draw_binding = None;
        }
    }

    fn create_image(&mut self, desc: &SurfaceDesc) -> Result<DeviceHandle> {
        self.record("create_image");
        if let Some(budget) = self.failures.image_budget.as_mut() {
            if *budget == 0 {
                return Err(Error::ResourceCreation("image allocation failed".to_string()));
            }
            *budget -= 1;
        }
        if desc.width == 0 || desc.height == 0 {
            return Err(Error::ResourceCreation(format!(
                "cannot allocate a {}x{} image", desc.width, desc.height
            )));
        }
        if desc.samples > 0 {
            let needed = match desc.kind {
                SurfaceKind::Texture => DeviceCapabilities::MULTISAMPLE_TEXTURE,
                SurfaceKind::Renderbuffer => DeviceCapabilities::MULTISAMPLE_RENDERBUFFER,
            };
            if !self.capabilities.contains(needed) {
                return Err(Error::ResourceCreation(format!(
                    "{:?} storage with {} samples is not supported", desc.kind, desc.samples
                )));
            }
        }
        let handle = self.allocate_handle()?;
        self.images.insert(handle, MockImage::new(*desc));
        self.images_created += 1;
        Ok(handle)
    }

    fn delete_image(&mut self, image: ImageRef) {
        self.record("delete_image");
        let handle = image.handle();
        self.images.remove(&handle);
        self.texture_units.retain(|_, bound| *bound != handle);
    }

    fn bind_framebuffer(&mut self, point: BindPoint, framebuffer: Option<DeviceHandle>) {
        self.record("bind_framebuffer");
        match point {
            BindPoint::Framebuffer => {
                self.read_binding = framebuffer;
                self.draw_binding = framebuffer;
            }
            BindPoint::Read => self.read_binding = framebuffer,
            BindPoint::Draw => self.draw_binding = framebuffer,
        }
    }

    fn bound_framebuffer(&self, point: BindPoint) -> Option<DeviceHandle> {
        self.binding(point)
    }

    fn attach_image(&mut self, point: AttachmentPoint, image: ImageRef, mip_level: u32) -> Result<()> {
        self.record("attach_image");
        if self.failures.attach {
            return Err(gpu_err!(SOURCE, "invalid operation while attaching {:?}", image));
        }
        let kind = self
            .images
            .get(&image.handle())
            .map(|img| img.desc.kind)
            .ok_or_else(|| gpu_err!(SOURCE, "attaching unknown image {:?}", image))?;
        let kind_matches = matches!(
            (image, kind),
            (ImageRef::Texture(_), SurfaceKind::Texture)
                | (ImageRef::Renderbuffer(_), SurfaceKind::Renderbuffer)
        );
        if !kind_matches {
            return Err(gpu_err!(SOURCE, "{:?} does not name a {:?}", image, kind));
        }
        if kind == SurfaceKind::Renderbuffer && mip_level != 0 {
            return Err(gpu_err!(SOURCE, "renderbuffers have no mip level {}", mip_level));
        }

        let attachment = MockAttachment { image, mip_level };
        let fb = self.bound_framebuffer_mut(BindPoint::Draw)?;
        match point {
            AttachmentPoint::Color(slot) => {
                let entry = fb
                    .color
                    .get_mut(slot)
                    .ok_or_else(|| Error::InvalidSlot { slot, max: MOCK_MAX_COLOR_ATTACHMENTS })?;
                *entry = Some(attachment);
            }
            depth_point => fb.depth = Some((depth_point, attachment)),
        }
        Ok(())
    }

    fn detach_image(&mut self, point: AttachmentPoint) {
        self.record("detach_image");
        if let Ok(fb) = self.bound_framebuffer_mut(BindPoint::Draw) {
            match point {
                AttachmentPoint::Color(slot) => {
                    if let Some(entry) = fb.color.get_mut(slot) {
                        *entry = None;
                    }
                }
                _ => fb.depth = None,
            }
        }
    }

    fn set_draw_buffers(&mut self, slots: &[usize]) {
        self.record("set_draw_buffers");
        if let Ok(fb) = self.bound_framebuffer_mut(BindPoint::Draw) {
            fb.draw_buffers = slots.to_vec();
        }
    }

    fn set_read_buffer(&mut self, slot: Option<usize>) {
        self.record("set_read_buffer");
        if let Ok(fb) = self.bound_framebuffer_mut(BindPoint::Read) {
            fb.read_buffer = slot;
        }
    }

    fn set_viewport(&mut self, viewport: Rect2D) {
        self.record("set_viewport");
        self.viewport = viewport;
    }

    fn viewport(&self) -> Rect2D {
        self.viewport
    }

    fn set_scissor_test(&mut self, enabled: bool) {
        self.record("set_scissor_test");
        self.scissor_test = enabled;
    }

    fn set_multisample(&mut self, enabled: bool) {
        self.record("set_multisample");
        self.multisample = enabled;
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.record("set_depth_test");
        self.depth_test = enabled;
    }

    fn framebuffer_status(&self, point: BindPoint) -> FramebufferStatus {
        let Some(handle) = self.binding(point) else {
            return FramebufferStatus::Complete;
        };
        if let Some(reason) = self.failures.forced_status {
            return FramebufferStatus::Incomplete(reason);
        }
        match self.framebuffers.get(&handle) {
            Some(fb) => self.evaluate_status(fb),
            None => FramebufferStatus::Incomplete(IncompleteReason::Undefined),
        }
    }

    fn blit(&mut self, src: Rect2D, dst: Rect2D, mask: BlitMask) -> Result<()> {
        self.record("blit");
        if !self.capabilities.contains(DeviceCapabilities::FRAMEBUFFER_BLIT) {
            gpu_bail!(SOURCE, "framebuffer blit is not supported");
        }
        if mask.is_empty() {
            gpu_bail!(SOURCE, "blit with an empty mask");
        }
        for part in [BlitMask::COLOR, BlitMask::DEPTH] {
            if mask.contains(part) {
                self.blit_one(src, dst, part)?;
            }
        }
        Ok(())
    }

    fn read_pixels(&mut self, rect: Rect2D, pixel_type: PixelType, out: &mut [u8]) -> Result<()> {
        self.record("read_pixels");
        let source = self.source_attachment(BlitMask::COLOR)?;
        let image = self.image_for(source)?;
        if image.desc.samples > 0 {
            gpu_bail!(SOURCE, "cannot read pixels from a multisample image");
        }

        let channel_size = pixel_type.size();
        let needed = rect.width as usize * rect.height as usize * 4 * channel_size;
        if out.len() < needed {
            return Err(gpu_err!(SOURCE, "readback buffer holds {} bytes, {} needed", out.len(), needed));
        }

        let mut offset = 0;
        for y in 0..rect.height as i32 {
            for x in 0..rect.width as i32 {
                let value = image.pixel(rect.x + x, rect.y + y).unwrap_or([0; 4]);
                for channel in value {
                    match pixel_type {
                        PixelType::UnsignedByte => out[offset] = channel,
                        PixelType::Float => {
                            let normalized = channel as f32 / 255.0;
                            out[offset..offset + 4].copy_from_slice(&normalized.to_ne_bytes());
                        }
                    }
                    offset += channel_size;
                }
            }
        }
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<DeviceHandle>) {
        self.record("bind_texture");
        match texture {
            Some(handle) => {
                self.texture_units.insert(unit, handle);
            }
            None => {
                self.texture_units.remove(&unit);
            }
        }
    }

    fn bound_texture(&self, unit: u32) -> Option<DeviceHandle> {
        self.texture_units.get(&unit).copied()
    }

    fn texture_unit(&self, texture: DeviceHandle) -> Option<u32> {
        self.texture_units
            .iter()
            .filter(|(_, bound)| **bound == texture)
            .map(|(unit, _)| *unit)
            .min()
    }

    fn set_depth_compare(&mut self, texture: DeviceHandle, enabled: bool) {
        self.record("set_depth_compare");
        if let Some(image) = self.images.get_mut(&texture) {
            image.depth_compare = enabled;
        }
    }
}

// ============================================================================
// Mock QuadRasterizer
// ============================================================================

/// One recorded quad draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockDraw {
    pub shader: BuiltinShader,
    pub scale: Vec2,
    /// Framebuffer bound for drawing at the time of the draw
    pub target: Option<DeviceHandle>,
    pub viewport: Rect2D,
    /// Texture bound on unit 0 at the time of the draw
    pub source: Option<DeviceHandle>,
}

/// Rasterizer that records draws instead of rasterizing
#[derive(Debug, Default)]
pub struct MockRasterizer {
    pub draws: Vec<MockDraw>,
    /// Fail every draw
    pub fail: bool,
}

impl MockRasterizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QuadRasterizer for MockRasterizer {
    fn draw_fullscreen_quad(
        &mut self,
        device: &mut dyn GraphicsDevice,
        shader: BuiltinShader,
        scale: Vec2,
    ) -> Result<()> {
        if self.fail {
            return Err(gpu_err!(SOURCE, "quad draw failed"));
        }
        self.draws.push(MockDraw {
            shader,
            scale,
            target: device.bound_framebuffer(BindPoint::Draw),
            viewport: device.viewport(),
            source: device.bound_texture(0),
        });
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
