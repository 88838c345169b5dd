//! Integration tests for offscreen buffers
//!
//! Drives whole render/resolve/readback cycles through the public API on
//! the mock device. No GPU required.
//!
//! Run with: cargo test --test offscreen_integration_tests

use gpu_framebuffer::gpufb::{ContextConfig, Error, GpuContext, OffscreenContext, OffscreenMode};
use gpu_framebuffer::gpufb::device::mock_graphics_device::MockGraphicsDevice;
use gpu_framebuffer::gpufb::device::{
    DeviceCapabilities, DeviceHandle, GraphicsDevice, Rect2D, TextureFormat,
};

// ============================================================================
// Helpers
// ============================================================================

fn context_with(capabilities: DeviceCapabilities) -> GpuContext<MockGraphicsDevice> {
    GpuContext::new(MockGraphicsDevice::with_capabilities(capabilities), ContextConfig::default())
}

fn context() -> GpuContext<MockGraphicsDevice> {
    context_with(DeviceCapabilities::all())
}

fn create(ctx: &mut GpuContext<MockGraphicsDevice>, width: u32, height: u32, samples: u32) -> OffscreenContext {
    OffscreenContext::create(ctx, width, height, samples, TextureFormat::R8G8B8A8_UNORM, OffscreenMode::empty())
        .unwrap()
}

fn color_image(ctx: &GpuContext<MockGraphicsDevice>, ofs: &OffscreenContext) -> DeviceHandle {
    ctx.surface(ofs.color().surface()).unwrap().handle()
}

/// Stand-in for a draw: paint the colour attachment directly
fn paint(ctx: &mut GpuContext<MockGraphicsDevice>, ofs: &OffscreenContext, rgba: [u8; 4]) {
    let image = color_image(ctx, ofs);
    assert!(ctx.device_mut().fill_image(image, rgba));
}

// ============================================================================
// Readback
// ============================================================================

#[test]
fn test_single_sample_render_and_read() {
    let mut ctx = context();
    let ofs = create(&mut ctx, 8, 6, 0);
    paint(&mut ctx, &ofs, [10, 20, 30, 255]);

    let mut pixels = vec![0u8; 8 * 6 * 4];
    ofs.read_pixels(&mut ctx, &mut pixels).unwrap();

    assert!(pixels.chunks(4).all(|px| px == [10, 20, 30, 255]));
    // No scratch target for single-sample buffers
    assert_eq!(ctx.device().framebuffers_created, 1);
    assert_eq!(ctx.bind_state().current(), None);

    ofs.free(&mut ctx).unwrap();
}

#[test]
fn test_multisample_resolve_leaves_no_scratch_resources() {
    let mut ctx = context();
    let ofs = create(&mut ctx, 16, 16, 4);
    assert_eq!(ofs.samples(), 4);
    paint(&mut ctx, &ofs, [200, 100, 50, 255]);

    let images_before = ctx.device().live_image_count();
    let framebuffers_before = ctx.device().live_framebuffer_count();

    let mut pixels = vec![0u8; 16 * 16 * 4];
    ofs.read_pixels(&mut ctx, &mut pixels).unwrap();

    assert!(pixels.chunks(4).all(|px| px == [200, 100, 50, 255]));
    assert_eq!(ctx.device().live_image_count(), images_before);
    assert_eq!(ctx.device().live_framebuffer_count(), framebuffers_before);
    assert_eq!(ctx.stats().live_surfaces, 2);
    assert_eq!(ctx.stats().live_targets, 1);
    assert_eq!(ctx.device().call_count("blit"), 1);

    ofs.free(&mut ctx).unwrap();
}

#[test]
fn test_float_readback_normalizes() {
    let mut ctx = context();
    let ofs = create(&mut ctx, 2, 2, 0);
    paint(&mut ctx, &ofs, [255, 0, 255, 0]);

    let mut pixels = vec![0.5f32; 2 * 2 * 4];
    ofs.read_pixels(&mut ctx, &mut pixels).unwrap();

    for px in pixels.chunks(4) {
        assert_eq!(px, [1.0, 0.0, 1.0, 0.0]);
    }

    ofs.free(&mut ctx).unwrap();
}

#[test]
fn test_readback_restores_previous_binding() {
    let mut ctx = context();
    let first = create(&mut ctx, 4, 4, 0);
    let second = create(&mut ctx, 4, 4, 4);

    first.bind_simple(&mut ctx).unwrap();
    let bound = ctx.target(first.framebuffer()).unwrap().handle();

    let mut pixels = vec![0u8; 4 * 4 * 4];
    second.read_pixels(&mut ctx, &mut pixels).unwrap();

    assert_eq!(ctx.bind_state().current(), Some(bound));
    assert!(ctx.is_target_bound(first.framebuffer()));

    first.free(&mut ctx).unwrap();
    second.free(&mut ctx).unwrap();
}

#[test]
fn test_short_readback_buffer_is_rejected() {
    let mut ctx = context();
    let ofs = create(&mut ctx, 4, 4, 0);

    let mut pixels = vec![0u8; 4 * 4 * 4 - 1];
    let result = ofs.read_pixels(&mut ctx, &mut pixels);
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert!(pixels.iter().all(|&value| value == 0));

    ofs.free(&mut ctx).unwrap();
}

// ============================================================================
// Capabilities
// ============================================================================

#[test]
fn test_unsupported_multisampling_falls_back_to_single_sample() {
    let mut ctx = context_with(DeviceCapabilities::all() - DeviceCapabilities::MULTISAMPLE_TEXTURE);
    let ofs = create(&mut ctx, 8, 8, 8);

    assert_eq!(ofs.samples(), 0);
    assert_eq!(ctx.surface(ofs.color().surface()).unwrap().samples(), 0);
    assert_eq!(ctx.surface(ofs.depth().surface()).unwrap().samples(), 0);

    paint(&mut ctx, &ofs, [1, 2, 3, 4]);
    let mut pixels = vec![0u8; 8 * 8 * 4];
    ofs.read_pixels(&mut ctx, &mut pixels).unwrap();
    assert_eq!(&pixels[..4], &[1, 2, 3, 4]);
    assert_eq!(ctx.device().call_count("blit"), 0);

    ofs.free(&mut ctx).unwrap();
}

#[test]
fn test_renderbuffer_backed_multisample_cannot_be_read() {
    let mut ctx = context();
    let mode = OffscreenMode::RENDERBUFFER_COLOR | OffscreenMode::RENDERBUFFER_DEPTH;
    let ofs = OffscreenContext::create(&mut ctx, 8, 8, 4, TextureFormat::R8G8B8A8_UNORM, mode).unwrap();
    assert_eq!(ofs.color_texture(), None);
    assert_eq!(ofs.depth_texture(), None);

    let mut pixels = vec![0u8; 8 * 8 * 4];
    let result = ofs.read_pixels(&mut ctx, &mut pixels);
    assert!(matches!(result, Err(Error::InvalidArgument(_))));

    ofs.free(&mut ctx).unwrap();
}

// ============================================================================
// Binding
// ============================================================================

#[test]
fn test_preserving_bind_restores_raster_state() {
    let mut ctx = context();
    let ofs = create(&mut ctx, 32, 24, 0);
    ctx.set_viewport(Rect2D::sized(640, 480));

    {
        let scope = ofs.bind(&mut ctx, true).unwrap();
        assert!(scope.preserves_state());
        assert_eq!(scope.device().viewport(), Rect2D::sized(32, 24));
        assert!(!scope.device().scissor_test());
    }

    assert_eq!(ctx.device().viewport(), Rect2D::sized(640, 480));
    assert!(ctx.device().scissor_test());
    assert_eq!(ctx.bind_state().current(), None);

    ofs.free(&mut ctx).unwrap();
}

#[test]
fn test_plain_bind_keeps_viewport() {
    let mut ctx = context();
    let ofs = create(&mut ctx, 32, 24, 0);
    ctx.set_viewport(Rect2D::sized(640, 480));

    {
        let scope = ofs.bind(&mut ctx, false).unwrap();
        assert!(!scope.preserves_state());
        assert!(!scope.device().scissor_test());
        scope.release();
    }

    assert!(ctx.device().scissor_test());
    assert_eq!(ctx.bind_state().current(), None);

    ofs.free(&mut ctx).unwrap();
}

// ============================================================================
// Blit
// ============================================================================

#[test]
fn test_blit_copies_overlap_without_scaling() {
    let mut ctx = context();
    let src = create(&mut ctx, 8, 8, 0);
    let dst = create(&mut ctx, 4, 4, 0);
    let src_image = color_image(&ctx, &src);
    let dst_image = color_image(&ctx, &dst);
    for y in 0..8 {
        for x in 0..8 {
            ctx.device_mut().set_pixel(src_image, x, y, [x as u8, y as u8, 0, 255]);
        }
    }

    src.blit(&mut ctx, &dst, true, false).unwrap();

    assert_eq!(ctx.device().pixel(dst_image, 3, 2), Some([3, 2, 0, 255]));
    assert_eq!(ctx.device().pixel(dst_image, 0, 3), Some([0, 3, 0, 255]));
    assert!(ctx.is_target_bound(dst.framebuffer()));

    src.free(&mut ctx).unwrap();
    dst.free(&mut ctx).unwrap();
}

#[test]
fn test_blit_needs_a_buffer() {
    let mut ctx = context();
    let src = create(&mut ctx, 4, 4, 0);
    let dst = create(&mut ctx, 4, 4, 0);

    let result = src.blit(&mut ctx, &dst, false, false);
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert_eq!(ctx.device().call_count("blit"), 0);

    src.free(&mut ctx).unwrap();
    dst.free(&mut ctx).unwrap();
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_free_releases_everything() {
    let mut ctx = context();
    for samples in [0, 4] {
        let ofs = create(&mut ctx, 16, 16, samples);
        let mut pixels = vec![0u8; 16 * 16 * 4];
        ofs.read_pixels(&mut ctx, &mut pixels).unwrap();
        ofs.free(&mut ctx).unwrap();
    }

    assert_eq!(ctx.stats().live_surfaces, 0);
    assert_eq!(ctx.stats().live_targets, 0);
    assert_eq!(ctx.device().live_image_count(), 0);
    assert_eq!(ctx.device().live_framebuffer_count(), 0);
}

#[test]
fn test_failed_create_unwinds() {
    let mut ctx = context();
    ctx.device_mut().failures.image_budget = Some(1);

    let result = OffscreenContext::create(&mut ctx, 16, 16, 0, TextureFormat::R8G8B8A8_UNORM, OffscreenMode::empty());
    assert!(result.is_err());

    assert_eq!(ctx.stats().live_surfaces, 0);
    assert_eq!(ctx.stats().live_targets, 0);
    assert_eq!(ctx.device().live_image_count(), 0);
    assert_eq!(ctx.device().live_framebuffer_count(), 0);
    assert_eq!(ctx.bind_state().current(), None);
}
