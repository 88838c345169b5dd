/// Device module - the contracts the framebuffer layer is written against

pub mod graphics_device;
pub mod texture;
pub mod rasterizer;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

pub use texture::*;
pub use rasterizer::*;

// In-memory device and rasterizer (headless backend, used by the tests)
pub mod mock_graphics_device;
