use crate::coords::{Color, Viewport};
use crate::render::{BatchState, ClearFlags, PrimitiveStyle, Vertex};

use super::{AdapterCaps, DepthStencilFormat, PixelFormat, PresentationParameters, ResultCode};

/// Opaque handle to a backend-owned GPU object (buffer, swap chain, texture).
///
/// Handles are invalidated by a device reset; owners drop them in
/// `on_device_lost` and obtain fresh ones in `on_device_reset`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct GpuHandle(u64);

impl GpuHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Identifies an additional presentation window known to the backend.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct WindowKey(pub u64);

/// Cooperative/operational level reported by a probe.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DeviceStatus {
    /// Device is usable.
    Operational,
    /// Device is lost and cannot be reset yet.
    Lost,
    /// Device is lost and ready to be reset.
    NotReset,
}

/// Result of a reset call that did not fail outright.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResetOutcome {
    Ready,
    /// Device is still not resettable; retry on a later probe.
    NotReady,
}

/// A render buffer handle with its pixel size.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BufferInfo {
    pub handle: GpuHandle,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RenderBufferKind {
    Color(PixelFormat),
    DepthStencil(DepthStencilFormat),
}

/// Offscreen render buffer request.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RenderBufferDesc {
    pub width: u32,
    pub height: u32,
    pub kind: RenderBufferKind,
}

/// GPU abstraction the device context drives.
///
/// Implementations must tolerate any call while lost (draws and clears become
/// no-ops) and must report loss only through `cooperative_level`.
pub trait GpuBackend {
    /// Adapter capability service used by the presentation parameter builder.
    fn capabilities(&self) -> &dyn AdapterCaps;

    fn create_device(&mut self, params: &PresentationParameters) -> Result<(), ResultCode>;

    /// Probes the device. `Err` means an unrecoverable driver failure.
    fn cooperative_level(&mut self) -> Result<DeviceStatus, ResultCode>;

    /// Resets the device with new parameters. `Err` means an unrecoverable driver failure.
    fn reset(&mut self, params: &PresentationParameters) -> Result<ResetOutcome, ResultCode>;

    fn release_device(&mut self);

    /// Color buffer of the primary swap chain.
    fn back_buffer(&mut self) -> Result<BufferInfo, ResultCode>;

    /// Depth buffer created with the device, if the parameters asked for one.
    fn auto_depth_stencil(&mut self) -> Option<BufferInfo>;

    fn create_render_buffer(&mut self, desc: &RenderBufferDesc) -> Result<BufferInfo, ResultCode>;

    /// Additional swap chain presenting into `window`.
    fn create_swap_chain(
        &mut self,
        window: WindowKey,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<BufferInfo, ResultCode>;

    /// RGBA8 texture used as a drawing pattern.
    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> Result<GpuHandle, ResultCode>;

    fn release(&mut self, handle: GpuHandle);

    fn set_render_target(&mut self, color: GpuHandle, depth: Option<GpuHandle>, viewport: Viewport);

    fn apply_render_state(&mut self, state: &BatchState);

    /// Issues one draw call for `vertices`.
    fn draw(&mut self, style: PrimitiveStyle, vertices: &[Vertex]);

    fn clear(&mut self, flags: ClearFlags, color: Color, depth: f32, stencil: u32);

    /// Presents the primary swap chain, or `swap_chain` when given.
    fn present(&mut self, swap_chain: Option<GpuHandle>);
}
