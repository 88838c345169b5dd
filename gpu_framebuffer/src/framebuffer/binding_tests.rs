//! Unit tests for binding.rs

use crate::context::{ContextConfig, GpuContext};
use crate::device::mock_graphics_device::MockGraphicsDevice;
use crate::device::{BindPoint, GraphicsDevice, Rect2D, SurfaceDesc, TextureFormat};
use crate::error::Error;
use crate::framebuffer::TargetKey;
use crate::surface::SurfaceKey;

fn context() -> GpuContext<MockGraphicsDevice> {
    let mut ctx = GpuContext::new(MockGraphicsDevice::new(), ContextConfig::default());
    ctx.set_viewport(Rect2D::sized(1920, 1080));
    ctx
}

fn attach(
    ctx: &mut GpuContext<MockGraphicsDevice>,
    target: TargetKey,
    slot: usize,
    desc: SurfaceDesc,
) -> SurfaceKey {
    let surface = ctx.create_surface(desc).unwrap();
    ctx.attach_surface(target, surface, slot, 0).unwrap();
    surface
}

fn selection(ctx: &GpuContext<MockGraphicsDevice>, target: TargetKey) -> (Vec<usize>, Option<usize>) {
    let fb = ctx.target(target).unwrap().handle();
    let state = ctx.device().framebuffer(fb).unwrap();
    (state.draw_buffers.clone(), state.read_buffer)
}

// ============================================================================
// bind_target
// ============================================================================

#[test]
fn test_bind_all_color_slots() {
    let mut ctx = context();
    let target = ctx.create_target().unwrap();
    attach(&mut ctx, target, 3, SurfaceDesc::texture(32, 32, TextureFormat::R8G8B8A8_UNORM));
    attach(&mut ctx, target, 1, SurfaceDesc::texture(64, 16, TextureFormat::R8G8B8A8_UNORM));
    ctx.restore_default_binding();

    ctx.bind_target(target).unwrap();

    assert!(ctx.is_target_bound(target));
    assert_eq!(selection(&ctx, target), (vec![1, 3], Some(1)));
    assert_eq!(ctx.device().viewport(), Rect2D::sized(64, 16));
    assert_eq!(ctx.raster_state().viewport, Rect2D::sized(64, 16));
}

#[test]
fn test_bind_depth_only() {
    let mut ctx = context();
    let target = ctx.create_target().unwrap();
    attach(&mut ctx, target, 0, SurfaceDesc::texture(128, 128, TextureFormat::D32_FLOAT));

    ctx.bind_target(target).unwrap();
    assert_eq!(selection(&ctx, target), (vec![], None));
    assert_eq!(ctx.device().viewport(), Rect2D::sized(128, 128));
    assert_eq!(ctx.check_complete(target), Ok(()));
}

#[test]
fn test_bind_target_without_attachments_fails() {
    let mut ctx = context();
    let target = ctx.create_target().unwrap();
    assert!(matches!(ctx.bind_target(target), Err(Error::InvalidArgument(_))));
    assert!(!ctx.is_target_bound(target));
}

// ============================================================================
// bind_target_slot
// ============================================================================

#[test]
fn test_bind_single_slot() {
    let mut ctx = context();
    let target = ctx.create_target().unwrap();
    attach(&mut ctx, target, 0, SurfaceDesc::texture(32, 32, TextureFormat::R8G8B8A8_UNORM));
    attach(&mut ctx, target, 2, SurfaceDesc::texture(48, 24, TextureFormat::R8G8B8A8_UNORM));

    ctx.bind_target_slot(target, 2).unwrap();
    assert_eq!(selection(&ctx, target), (vec![2], Some(2)));
    assert_eq!(ctx.device().viewport(), Rect2D::sized(48, 24));
}

#[test]
fn test_bind_empty_or_invalid_slot_touches_nothing() {
    let mut ctx = context();
    let target = ctx.create_target().unwrap();
    attach(&mut ctx, target, 0, SurfaceDesc::texture(32, 32, TextureFormat::R8G8B8A8_UNORM));
    ctx.restore_default_binding();
    let calls = ctx.device().calls.len();

    assert_eq!(ctx.bind_target_slot(target, 1), Err(Error::EmptySlot(1)));
    assert_eq!(ctx.bind_target_slot(target, 9), Err(Error::InvalidSlot { slot: 9, max: 4 }));
    assert_eq!(ctx.device().calls.len(), calls);
    assert!(!ctx.is_target_bound(target));
}

// ============================================================================
// bind_surface_as_target
// ============================================================================

#[test]
fn test_bind_surface_scope_restores_state() {
    let mut ctx = context();
    let target = ctx.create_target().unwrap();
    let surface = attach(
        &mut ctx,
        target,
        1,
        SurfaceDesc::texture(256, 256, TextureFormat::R8G8B8A8_UNORM).with_samples(4),
    );
    attach(&mut ctx, target, 0, SurfaceDesc::texture(256, 256, TextureFormat::R8G8B8A8_UNORM).with_samples(4));
    ctx.restore_default_binding();

    {
        let scope = ctx.bind_surface_as_target(surface).unwrap();
        assert!(scope.preserves_state());
        assert!(scope.is_target_bound(target));
        assert!(!scope.device().scissor_test());
        assert!(scope.device().multisample());
        assert_eq!(scope.device().viewport(), Rect2D::sized(256, 256));
        assert_eq!(selection(&scope, target), (vec![1], Some(1)));
    }

    assert!(ctx.device().scissor_test());
    assert!(!ctx.device().multisample());
    assert_eq!(ctx.device().viewport(), Rect2D::sized(1920, 1080));
    // the binding itself is left to the caller
    assert!(ctx.is_target_bound(target));
}

#[test]
fn test_bind_depth_surface_selects_no_buffers() {
    let mut ctx = context();
    let target = ctx.create_target().unwrap();
    let depth = attach(&mut ctx, target, 0, SurfaceDesc::texture(64, 64, TextureFormat::D32_FLOAT));

    let scope = ctx.bind_surface_as_target(depth).unwrap();
    assert_eq!(selection(&scope, target), (vec![], None));
    assert!(!scope.device().multisample());
}

#[test]
fn test_bind_unattached_surface_pushes_nothing() {
    let mut ctx = context();
    let surface = ctx
        .create_surface(SurfaceDesc::texture(8, 8, TextureFormat::R8G8B8A8_UNORM))
        .unwrap();
    let calls = ctx.device().calls.len();

    assert!(matches!(ctx.bind_surface_as_target(surface), Err(Error::InvalidArgument(_))));
    assert_eq!(ctx.device().calls.len(), calls);
}

// ============================================================================
// bind_target_simple / bind_all_attachments
// ============================================================================

#[test]
fn test_bind_simple_keeps_viewport() {
    let mut ctx = context();
    let target = ctx.create_target().unwrap();
    attach(&mut ctx, target, 0, SurfaceDesc::texture(16, 16, TextureFormat::R8G8B8A8_UNORM));
    ctx.restore_default_binding();

    ctx.bind_target_simple(target).unwrap();
    assert!(ctx.is_target_bound(target));
    assert_eq!(selection(&ctx, target), (vec![0], Some(0)));
    assert_eq!(ctx.device().viewport(), Rect2D::sized(1920, 1080));
}

#[test]
fn test_bind_all_attachments_reads_slot_zero() {
    let mut ctx = context();
    let target = ctx.create_target().unwrap();
    attach(&mut ctx, target, 0, SurfaceDesc::texture(16, 16, TextureFormat::R8G8B8A8_UNORM));
    attach(&mut ctx, target, 2, SurfaceDesc::texture(16, 16, TextureFormat::R8G8B8A8_UNORM));

    ctx.bind_all_attachments(target).unwrap();
    assert_eq!(selection(&ctx, target), (vec![0, 2], Some(0)));
    assert_eq!(ctx.device().bound_framebuffer(BindPoint::Framebuffer), Some(ctx.target(target).unwrap().handle()));
}

#[test]
fn test_repeated_bind_is_skipped() {
    let mut ctx = context();
    let target = ctx.create_target().unwrap();
    attach(&mut ctx, target, 0, SurfaceDesc::texture(16, 16, TextureFormat::R8G8B8A8_UNORM));
    let skipped = ctx.stats().redundant_binds_skipped;

    ctx.bind_target_simple(target).unwrap();
    ctx.bind_target_simple(target).unwrap();
    assert_eq!(ctx.stats().redundant_binds_skipped, skipped + 2);
}
