/// Surface formats, storage kinds and the creation descriptor

/// Pixel format of a render surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    // Color formats
    R8G8B8A8_UNORM,
    R16G16B16A16_SFLOAT,
    R32G32B32A32_SFLOAT,

    // Depth / stencil formats
    D16_UNORM,
    D32_FLOAT,
    D24_UNORM_S8_UINT,
}

impl TextureFormat {
    /// Whether the format carries depth
    pub fn is_depth(self) -> bool {
        matches!(
            self,
            TextureFormat::D16_UNORM | TextureFormat::D32_FLOAT | TextureFormat::D24_UNORM_S8_UINT
        )
    }

    /// Whether the format carries stencil
    pub fn has_stencil(self) -> bool {
        matches!(self, TextureFormat::D24_UNORM_S8_UINT)
    }
}

/// Storage kind of a render surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// Sampleable texture, can be read by shaders after rendering
    Texture,
    /// Render-only storage, cannot be sampled
    Renderbuffer,
}

/// Descriptor for creating a render surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceDesc {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Sample count (0 = single-sample)
    pub samples: u32,
    /// Pixel format
    pub format: TextureFormat,
    /// Storage kind
    pub kind: SurfaceKind,
}

impl SurfaceDesc {
    /// Single-sample texture
    pub fn texture(width: u32, height: u32, format: TextureFormat) -> Self {
        Self { width, height, samples: 0, format, kind: SurfaceKind::Texture }
    }

    /// Single-sample renderbuffer
    pub fn renderbuffer(width: u32, height: u32, format: TextureFormat) -> Self {
        Self { width, height, samples: 0, format, kind: SurfaceKind::Renderbuffer }
    }

    /// Same surface with `samples` samples per pixel
    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    /// Number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}
