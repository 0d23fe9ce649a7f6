use crate::coords::{Color, Viewport};
use crate::render::batch::{Batcher, DEFAULT_BATCH_CAPACITY};
use crate::render::{BatchState, ClearFlags, PrimitiveStyle, RenderStateBlock, Vertex};

use super::{
    BufferInfo, DeviceError, DeviceRegistry, DeviceState, GpuBackend, GpuHandle,
    PresentationParameters, ResourceId, VideoMode, VsyncInterval, WindowKind,
};

/// Device context configuration.
///
/// Defaults match a 2D immediate-mode renderer drawing into a top-level window.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Vertex capacity of the shared primitive batch.
    pub batch_capacity: usize,

    /// Consecutive "not ready" reset results tolerated before giving up.
    ///
    /// `None` retries for as long as the caller keeps probing.
    pub max_reset_attempts: Option<u32>,

    /// Keep back-buffer contents across present (`SwapEffect::Copy`).
    pub preserve_back_buffer: bool,

    /// Buffers cleared by `RenderSurface::clear` unless a surface overrides it.
    pub clear_mask: ClearFlags,

    /// State block reapplied after creation and after every reset.
    pub default_render_state: RenderStateBlock,

    /// What the primary swap chain presents into.
    pub window_kind: WindowKind,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            batch_capacity: DEFAULT_BATCH_CAPACITY,
            max_reset_attempts: Some(600),
            preserve_back_buffer: false,
            clear_mask: ClearFlags::all(),
            default_render_state: RenderStateBlock::default(),
            window_kind: WindowKind::TopLevel,
        }
    }
}

/// The last mode request; parameters are rebuilt from it on every reset.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ModeSettings {
    pub mode: VideoMode,
    pub windowed: bool,
    pub use_depth: bool,
    pub use_stencil: bool,
    pub vsync: VsyncInterval,
}

/// Buffers and viewport a surface draws into while it is the active target.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TargetBinding {
    pub id: ResourceId,
    pub color: GpuHandle,
    pub depth: Option<GpuHandle>,
    pub viewport: Viewport,
}

/// Owns the device, its resource registry, the primitive batch, and the
/// active render target.
///
/// Everything here lives on the thread that owns the window; nothing is
/// global, so independent contexts can coexist.
pub struct DeviceContext {
    pub(super) backend: Box<dyn GpuBackend>,
    pub(super) config: DeviceConfig,
    pub(super) registry: DeviceRegistry,
    pub(super) batcher: Batcher,

    pub(super) state: DeviceState,
    pub(super) settings: Option<ModeSettings>,
    pub(super) params: Option<PresentationParameters>,
    /// Client size from the last resize event; `None` uses the mode size.
    pub(super) client_size: Option<(u32, u32)>,
    pub(super) focused: bool,

    pub(super) back_buffer: Option<BufferInfo>,
    pub(super) depth_buffer: Option<BufferInfo>,
    pub(super) active: Option<TargetBinding>,
    /// The active target was bound by `begin_target`, not by a stray draw.
    pub(super) active_session: bool,
    /// Session interrupted by the active one; restored by `end_target`.
    pub(super) previous: Option<TargetBinding>,

    /// Resources already released for the current loss.
    pub(super) lost_notified: bool,
    pub(super) reset_attempts: u32,
}

impl DeviceContext {
    pub fn new(backend: Box<dyn GpuBackend>, config: DeviceConfig) -> Self {
        let batcher = Batcher::new(config.batch_capacity);
        Self {
            backend,
            config,
            registry: DeviceRegistry::new(),
            batcher,
            state: DeviceState::Uninitialized,
            settings: None,
            params: None,
            client_size: None,
            focused: true,
            back_buffer: None,
            depth_buffer: None,
            active: None,
            active_session: false,
            previous: None,
            lost_notified: false,
            reset_attempts: 0,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Parameters the device currently runs with (or will be reset with).
    pub fn params(&self) -> Option<&PresentationParameters> {
        self.params.as_ref()
    }

    pub fn settings(&self) -> Option<&ModeSettings> {
        self.settings.as_ref()
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn gpu(&mut self) -> &mut dyn GpuBackend {
        self.backend.as_mut()
    }

    pub fn batcher(&self) -> &Batcher {
        &self.batcher
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// True while draws reach the device; lost or not-yet-created devices drop them.
    pub fn is_drawable(&self) -> bool {
        self.state == DeviceState::Active
    }

    /// Primary back buffer size, once the device is active.
    pub fn back_buffer_size(&self) -> Option<(u32, u32)> {
        self.back_buffer.map(|b| (b.width, b.height))
    }

    /// Number of windows presenting through this context, primary included.
    pub fn render_windows(&self) -> usize {
        1 + self.registry.count_render_windows()
    }

    pub fn active_target(&self) -> Option<ResourceId> {
        self.active.map(|b| b.id)
    }

    pub fn previous_target(&self) -> Option<ResourceId> {
        self.previous.map(|b| b.id)
    }

    pub fn is_target_active(&self, id: ResourceId) -> bool {
        self.active_target() == Some(id)
    }

    /// Opens a drawing session on `binding`, remembering the current session.
    ///
    /// Returns `Ok(false)` when the target is already active or the device
    /// cannot draw; an active target bound by a stray draw is promoted to a
    /// session in place. Only one interrupted session is kept.
    pub fn begin_target(&mut self, binding: TargetBinding) -> Result<bool, DeviceError> {
        if !self.is_drawable() {
            return Ok(false);
        }
        if self.is_target_active(binding.id) {
            self.active_session = true;
            return Ok(false);
        }
        if let (true, Some(active), Some(previous)) =
            (self.active_session, self.active, self.previous)
        {
            return Err(DeviceError::NestingTooDeep {
                requested: binding.id.raw(),
                active: active.id.raw(),
                previous: previous.id.raw(),
            });
        }

        self.flush();
        // Only sessions are restored; a target bound by a stray draw is not.
        self.previous = if self.active_session {
            self.active.take()
        } else {
            None
        };
        self.bind(binding);
        self.active_session = true;
        Ok(true)
    }

    /// Ends the session of `id` and restores the interrupted one.
    ///
    /// With nothing to restore the primary back buffer is bound again.
    pub fn end_target(&mut self, id: ResourceId) -> bool {
        if !self.is_target_active(id) {
            log::debug!("end_drawing on inactive target {id}; ignored");
            return false;
        }

        self.flush();
        self.active = self.previous.take();
        self.active_session = self.active.is_some();
        match self.active {
            Some(previous) => self.backend.set_render_target(
                previous.color,
                previous.depth,
                previous.viewport,
            ),
            None => self.bind_back_buffer(),
        }
        true
    }

    /// Drops a target from the binding slots without flushing (target released).
    pub fn forget_target(&mut self, id: ResourceId) {
        if self.previous.is_some_and(|b| b.id == id) {
            self.previous = None;
        }
        if self.is_target_active(id) {
            self.batcher.discard();
            self.active = self.previous.take();
            self.active_session = self.active.is_some();
        }
    }

    /// Hands one primitive list for `binding` to the batch.
    ///
    /// Outside any session the target simply becomes active. While another
    /// target's session is open the draw is issued on a temporary binding and
    /// the session's target is bound again, so the begin/end pairing of the
    /// session is left intact. Returns false when the draw was dropped.
    pub fn draw_to(
        &mut self,
        binding: TargetBinding,
        vertices: &[Vertex],
        style: PrimitiveStyle,
        state: BatchState,
    ) -> bool {
        if !self.is_drawable() {
            return false;
        }
        if self.is_target_active(binding.id) {
            self.batcher
                .submit(self.backend.as_mut(), vertices, style, state);
            return true;
        }

        match self.active.filter(|_| self.active_session) {
            Some(session) => {
                log::debug!(
                    "draw on {} during session of {}; issued out of band",
                    binding.id,
                    session.id
                );
                self.flush();
                self.backend
                    .set_render_target(binding.color, binding.depth, binding.viewport);
                self.batcher
                    .submit(self.backend.as_mut(), vertices, style, state);
                self.flush();
                self.backend
                    .set_render_target(session.color, session.depth, session.viewport);
            }
            None => {
                self.flush();
                self.bind(binding);
                self.active_session = false;
                self.batcher
                    .submit(self.backend.as_mut(), vertices, style, state);
            }
        }
        true
    }

    /// Issues the pending batch, if any.
    pub fn flush(&mut self) -> bool {
        if !self.is_drawable() {
            return false;
        }
        self.batcher.flush(self.backend.as_mut())
    }

    /// Clears the active target after flushing what was drawn before.
    pub fn clear_target(&mut self, flags: ClearFlags, color: Color, depth: f32, stencil: u32) {
        if !self.is_drawable() || flags.is_empty() {
            return;
        }
        self.flush();
        self.backend.clear(flags, color, depth, stencil);
    }

    fn bind(&mut self, binding: TargetBinding) {
        self.backend
            .set_render_target(binding.color, binding.depth, binding.viewport);
        self.active = Some(binding);
    }

    pub(super) fn bind_back_buffer(&mut self) {
        if let Some(bb) = self.back_buffer {
            self.backend.set_render_target(
                bb.handle,
                self.depth_buffer.map(|d| d.handle),
                Viewport::full(bb.width, bb.height),
            );
        }
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::warn!("device shutdown reported an error: {e}");
        }
    }
}
