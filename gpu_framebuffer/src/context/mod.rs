/// Context module - per-device framebuffer state and scoped binds

pub mod gpu_context;
pub mod bind_state;
pub mod raster_state;

pub use gpu_context::{GpuContext, ContextConfig, ContextStats};
pub use bind_state::DeviceBindState;
pub use raster_state::{RasterState, TargetScope};
