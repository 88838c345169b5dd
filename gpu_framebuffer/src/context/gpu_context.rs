/// GpuContext - framebuffer state of one graphics device context
///
/// Owns the device binding, the arenas of surfaces and targets created on
/// it, the record of which framebuffer is bound, and a mirror of the
/// rasterizer state that scoped binds save and restore. Operations on
/// surfaces, targets and offscreen buffers are implemented in their own
/// modules as further `impl` blocks on this type.

use slotmap::SlotMap;
use crate::error::{Error, Result};
use crate::gpu::Gpu;
use crate::context::{DeviceBindState, RasterState};
use crate::device::{BindPoint, DeviceHandle, GraphicsDevice, Rect2D};
use crate::surface::{RenderSurface, SurfaceKey};
use crate::framebuffer::{FramebufferTarget, TargetKey};

const SOURCE: &str = "gpufb::GpuContext";

// ============================================================================
// Configuration and statistics
// ============================================================================

/// Context configuration
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Enable extra checks (feedback-loop detection on attach)
    pub enable_validation: bool,
    /// Name used in log records
    pub label: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            label: "gpufb context".to_string(),
        }
    }
}

/// Context statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextStats {
    /// Surfaces currently alive
    pub live_surfaces: usize,
    /// Framebuffer targets currently alive
    pub live_targets: usize,
    /// Framebuffer binds issued to the device
    pub bind_calls: u64,
    /// Binds skipped because the framebuffer was already current
    pub redundant_binds_skipped: u64,
}

// ============================================================================
// GpuContext
// ============================================================================

pub struct GpuContext<D: GraphicsDevice> {
    pub(crate) device: D,
    pub(crate) config: ContextConfig,
    pub(crate) bind_state: DeviceBindState,
    pub(crate) raster: RasterState,
    pub(crate) surfaces: SlotMap<SurfaceKey, RenderSurface>,
    pub(crate) targets: SlotMap<TargetKey, FramebufferTarget>,
    pub(crate) stats: ContextStats,
}

impl<D: GraphicsDevice> GpuContext<D> {
    /// Wrap a device, taking it to a known state
    ///
    /// The default target is bound, scissor test enabled, multisample
    /// rasterization disabled, and the device's current viewport kept.
    pub fn new(mut device: D, config: ContextConfig) -> Self {
        let raster = RasterState {
            viewport: device.viewport(),
            ..RasterState::default()
        };
        device.bind_framebuffer(BindPoint::Framebuffer, None);
        device.set_scissor_test(raster.scissor_test);
        device.set_multisample(raster.multisample);

        crate::gpu_debug!(SOURCE, "created context '{}' (validation: {})", config.label, config.enable_validation);

        Self {
            device,
            config,
            bind_state: DeviceBindState::new(),
            raster,
            surfaces: SlotMap::with_key(),
            targets: SlotMap::with_key(),
            stats: ContextStats::default(),
        }
    }

    // ===== ACCESSORS =====

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Direct device access, for draws issued by the caller
    ///
    /// Binding framebuffers through this bypasses the bind record; use the
    /// context's bind operations for that.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn bind_state(&self) -> &DeviceBindState {
        &self.bind_state
    }

    pub fn raster_state(&self) -> RasterState {
        self.raster
    }

    /// Current statistics, live counts included
    pub fn stats(&self) -> ContextStats {
        ContextStats {
            live_surfaces: self.surfaces.len(),
            live_targets: self.targets.len(),
            ..self.stats
        }
    }

    /// Surface by key
    pub fn surface(&self, key: SurfaceKey) -> Option<&RenderSurface> {
        self.surfaces.get(key)
    }

    /// Framebuffer target by key
    pub fn target(&self, key: TargetKey) -> Option<&FramebufferTarget> {
        self.targets.get(key)
    }

    // ===== RASTER STATE =====

    pub fn set_viewport(&mut self, viewport: Rect2D) {
        self.raster.viewport = viewport;
        self.device.set_viewport(viewport);
    }

    pub fn set_scissor_test(&mut self, enabled: bool) {
        self.raster.scissor_test = enabled;
        self.device.set_scissor_test(enabled);
    }

    pub fn set_multisample(&mut self, enabled: bool) {
        self.raster.multisample = enabled;
        self.device.set_multisample(enabled);
    }

    pub(crate) fn apply_raster_state(&mut self, state: RasterState) {
        self.set_viewport(state.viewport);
        self.set_scissor_test(state.scissor_test);
        self.set_multisample(state.multisample);
    }

    // ===== BINDING =====

    /// Bind the default target, unless it is already current
    pub fn restore_default_binding(&mut self) {
        if !self.bind_state.is_currently_bound(None) {
            self.device.bind_framebuffer(BindPoint::Framebuffer, None);
            self.bind_state.restore_default();
            self.stats.bind_calls += 1;
        }
    }

    /// Make `framebuffer` the combined read/draw binding, skipping the
    /// device call when it already is
    pub(crate) fn ensure_bound(&mut self, framebuffer: Option<DeviceHandle>) {
        if self.bind_state.is_currently_bound(framebuffer) {
            self.stats.redundant_binds_skipped += 1;
            crate::gpu_trace!(SOURCE, "framebuffer {:?} already bound", framebuffer);
            return;
        }
        self.device.bind_framebuffer(BindPoint::Framebuffer, framebuffer);
        self.bind_state.record_bound(framebuffer);
        self.stats.bind_calls += 1;
    }

    /// Bind `framebuffer` at the combined point unconditionally
    ///
    /// For use after the read or draw point was bound separately, when the
    /// record no longer describes both points.
    pub(crate) fn force_bind(&mut self, framebuffer: Option<DeviceHandle>) {
        self.device.bind_framebuffer(BindPoint::Framebuffer, framebuffer);
        self.bind_state.record_bound(framebuffer);
        self.stats.bind_calls += 1;
    }

    // ===== LOOKUP =====

    pub(crate) fn lookup_surface(&self, key: SurfaceKey) -> Result<&RenderSurface> {
        self.surfaces.get(key).ok_or_else(|| {
            Gpu::log_and_return_error(
                SOURCE,
                Error::InvalidArgument(format!("unknown surface {:?}", key)),
            )
        })
    }

    pub(crate) fn lookup_target(&self, key: TargetKey) -> Result<&FramebufferTarget> {
        self.targets.get(key).ok_or_else(|| {
            Gpu::log_and_return_error(
                SOURCE,
                Error::InvalidArgument(format!("unknown framebuffer target {:?}", key)),
            )
        })
    }
}

impl<D: GraphicsDevice> Drop for GpuContext<D> {
    fn drop(&mut self) {
        if !self.surfaces.is_empty() || !self.targets.is_empty() {
            crate::gpu_warn!(
                SOURCE,
                "context '{}' dropped with {} live surface(s) and {} live target(s)",
                self.config.label,
                self.surfaces.len(),
                self.targets.len()
            );
        }
    }
}

#[cfg(test)]
#[path = "gpu_context_tests.rs"]
mod tests;
