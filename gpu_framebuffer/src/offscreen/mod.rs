/// Offscreen module - self-contained render buffers with readback

pub mod offscreen_context;

pub use offscreen_context::{clamp_samples, Backing, OffscreenContext, OffscreenMode};
