/*!
# GPU Framebuffer

Framebuffer and render-target management over an abstract graphics device.

Surfaces (textures or renderbuffers) are attached to framebuffer targets,
bound for rendering, checked for completeness, blitted, blurred and read
back. All state of one device context lives in a [`gpufb::GpuContext`];
the graphics API itself sits behind the [`gpufb::device::GraphicsDevice`]
trait.

## Architecture

- **GpuContext**: owns the device, the surface and target arenas and the
  record of the bound framebuffer
- **RenderSurface**: a device image with a back-reference to its attachment
- **FramebufferTarget**: four colour slots and a depth slot
- **OffscreenContext**: a target plus its own colour and depth surfaces,
  with multisample resolve on readback
- **TargetScope**: guard restoring rasterizer state after scoped binds

`device::mock_graphics_device` provides an in-memory device that runs the
whole layer headless.
*/

// Internal modules
mod error;
mod gpu;
pub mod log;
pub mod device;
pub mod context;
pub mod surface;
pub mod framebuffer;
pub mod offscreen;

// Main gpufb namespace module
pub mod gpufb {
    // Error types
    pub use crate::error::{Error, IncompleteReason, Result};

    // Logging facade
    pub use crate::gpu::Gpu;

    // Per-device state
    pub use crate::context::{
        ContextConfig, ContextStats, DeviceBindState, GpuContext, RasterState, TargetScope,
    };

    // Surfaces and targets
    pub use crate::surface::{RenderSurface, SurfaceAttachment, SurfaceKey};
    pub use crate::framebuffer::{FramebufferTarget, TargetKey, MAX_COLOR_SLOTS};
    pub use crate::offscreen::{clamp_samples, Backing, OffscreenContext, OffscreenMode};

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Device contract and mock backend
    pub mod device {
        pub use crate::device::*;
    }
}

// Re-export math library at crate root
pub use glam;
