/// Framebuffer module - targets, attachments, binds and composites

pub mod framebuffer_target;
pub mod attachment;
pub mod binding;
pub mod blit;
pub mod blur;

pub use framebuffer_target::{FramebufferTarget, TargetKey, MAX_COLOR_SLOTS};
