//! Unit tests for blur.rs

use glam::Vec2;
use crate::context::{ContextConfig, GpuContext};
use crate::device::mock_graphics_device::{MockGraphicsDevice, MockRasterizer};
use crate::device::{BuiltinShader, GraphicsDevice, Rect2D, SurfaceDesc, TextureFormat};
use crate::error::Error;
use crate::framebuffer::TargetKey;
use crate::surface::SurfaceKey;

fn context() -> GpuContext<MockGraphicsDevice> {
    GpuContext::new(MockGraphicsDevice::new(), ContextConfig::default())
}

fn pair(ctx: &mut GpuContext<MockGraphicsDevice>, width: u32, height: u32) -> (TargetKey, SurfaceKey) {
    let target = ctx.create_target().unwrap();
    let surface = ctx
        .create_surface(SurfaceDesc::texture(width, height, TextureFormat::R8G8B8A8_UNORM))
        .unwrap();
    ctx.attach_surface(target, surface, 0, 0).unwrap();
    (target, surface)
}

#[test]
fn test_blur_draws_two_passes() {
    let mut ctx = context();
    let (target, surface) = pair(&mut ctx, 200, 100);
    let (blur_target, blur_surface) = pair(&mut ctx, 50, 25);
    let mut rasterizer = MockRasterizer::new();

    ctx.blur(&mut rasterizer, target, surface, blur_target, blur_surface, 0.5).unwrap();

    assert_eq!(rasterizer.draws.len(), 2);
    let horizontal = rasterizer.draws[0];
    let vertical = rasterizer.draws[1];

    assert_eq!(horizontal.shader, BuiltinShader::SeparableGaussianBlur);
    assert_eq!(horizontal.target, Some(ctx.target(blur_target).unwrap().handle()));
    assert_eq!(horizontal.source, Some(ctx.surface(surface).unwrap().handle()));
    assert_eq!(horizontal.viewport, Rect2D::sized(50, 25));
    assert_eq!(horizontal.scale, Vec2::new(0.5 / 50.0, 0.0));

    assert_eq!(vertical.target, Some(ctx.target(target).unwrap().handle()));
    assert_eq!(vertical.source, Some(ctx.surface(blur_surface).unwrap().handle()));
    assert_eq!(vertical.viewport, Rect2D::sized(200, 100));
    assert_eq!(vertical.scale, Vec2::new(0.0, 0.5 / 100.0));
}

#[test]
fn test_blur_leaves_target_bound_and_unit_clear() {
    let mut ctx = context();
    let (target, surface) = pair(&mut ctx, 32, 32);
    let (blur_target, blur_surface) = pair(&mut ctx, 32, 32);
    let mut rasterizer = MockRasterizer::new();

    ctx.blur(&mut rasterizer, target, surface, blur_target, blur_surface, 0.0).unwrap();

    assert!(ctx.is_target_bound(target));
    assert_eq!(ctx.device().bound_texture(0), None);
    assert!(!ctx.device().depth_test());
}

#[test]
fn test_blur_rejects_renderbuffers() {
    let mut ctx = context();
    let (target, surface) = pair(&mut ctx, 32, 32);
    let blur_target = ctx.create_target().unwrap();
    let blur_surface = ctx
        .create_surface(SurfaceDesc::renderbuffer(32, 32, TextureFormat::R8G8B8A8_UNORM))
        .unwrap();
    ctx.attach_surface(blur_target, blur_surface, 0, 0).unwrap();
    let mut rasterizer = MockRasterizer::new();

    let result = ctx.blur(&mut rasterizer, target, surface, blur_target, blur_surface, 0.5);
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert!(rasterizer.draws.is_empty());
}

#[test]
fn test_blur_draw_failure_clears_unit() {
    let mut ctx = context();
    let (target, surface) = pair(&mut ctx, 32, 32);
    let (blur_target, blur_surface) = pair(&mut ctx, 32, 32);
    let mut rasterizer = MockRasterizer { fail: true, ..MockRasterizer::default() };

    assert!(ctx.blur(&mut rasterizer, target, surface, blur_target, blur_surface, 0.5).is_err());
    assert_eq!(ctx.device().bound_texture(0), None);
}
