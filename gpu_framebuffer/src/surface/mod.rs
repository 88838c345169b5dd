/// Surface module - textures and renderbuffers used as attachments

pub mod render_surface;

pub use render_surface::{RenderSurface, SurfaceAttachment, SurfaceKey};
