/// Full-screen-quad rasterizer contract
///
/// The framebuffer layer only binds targets and viewports around quad
/// draws; how the quad gets drawn is up to the implementor.

use glam::Vec2;
use crate::error::Result;
use crate::device::GraphicsDevice;

/// Built-in programs the framebuffer composites rely on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinShader {
    /// One direction of a separable gaussian blur, direction given by the scale
    SeparableGaussianBlur,
}

/// Draws a screen-covering quad sampling the texture bound on unit 0
pub trait QuadRasterizer {
    /// Draw one quad into the currently bound draw target
    ///
    /// # Arguments
    ///
    /// * `device` - Device the quad is drawn with
    /// * `shader` - Program to draw with
    /// * `scale` - Texel step forwarded to the program
    fn draw_fullscreen_quad(
        &mut self,
        device: &mut dyn GraphicsDevice,
        shader: BuiltinShader,
        scale: Vec2,
    ) -> Result<()>;
}
