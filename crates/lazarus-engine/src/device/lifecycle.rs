//! Device lifecycle state machine.
//!
//! ```text
//! Uninitialized -> Created -> Active <-> Lost -> Resetting -> Active
//!                                 any live state -> Destroyed
//! ```
//!
//! Loss is detected by probing (on present, focus and resize); it is never an
//! error for the caller. While not `Active` draws are dropped.

use std::fmt;

use crate::coords::Viewport;
use crate::render::BatchState;

use super::{
    DeviceContext, DeviceError, DeviceStatus, ModeSettings, PresentRequest,
    PresentationParameters, ResetOutcome, VideoMode, VsyncInterval,
};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DeviceState {
    Uninitialized,
    /// Device exists; buffers not acquired yet.
    Created,
    Active,
    /// Probe reported loss; resources have released their GPU handles.
    Lost,
    /// Reset was issued but the device is not ready yet.
    Resetting,
    Destroyed,
}

impl DeviceState {
    /// States in which a device object exists.
    pub fn is_live(self) -> bool {
        !matches!(self, DeviceState::Uninitialized | DeviceState::Destroyed)
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl DeviceContext {
    /// Requests a video mode.
    ///
    /// Creates the device on first use. Afterwards the device is reset only when
    /// the rebuilt parameters differ from the current ones, or `force_reset` is set.
    pub fn set_mode(
        &mut self,
        mode: VideoMode,
        windowed: bool,
        use_depth: bool,
        use_stencil: bool,
        force_reset: bool,
        vsync: VsyncInterval,
    ) -> Result<(), DeviceError> {
        if self.state == DeviceState::Destroyed {
            return Err(DeviceError::Destroyed);
        }

        self.settings = Some(ModeSettings {
            mode,
            windowed,
            use_depth,
            use_stencil,
            vsync,
        });
        // A new mode replaces whatever size the window was dragged to.
        self.client_size = None;

        let params = self.build_params()?;
        log::info!(
            "set_mode {}x{} {:?} windowed={} depth={:?} vsync={:?}",
            params.back_buffer_width,
            params.back_buffer_height,
            params.back_buffer_format,
            params.windowed,
            params.auto_depth_stencil_format,
            params.presentation_interval,
        );

        match self.state {
            DeviceState::Uninitialized => self.create(params),
            DeviceState::Lost | DeviceState::Resetting => {
                log::debug!("device is {}; new mode applies on the next reset", self.state);
                self.params = Some(params);
                Ok(())
            }
            _ if !force_reset && self.params == Some(params) => {
                log::debug!("mode unchanged; reset skipped");
                Ok(())
            }
            _ => {
                self.params = Some(params);
                self.reconfigure()
            }
        }
    }

    /// Effective windowed flag, after policy downgrades.
    pub fn windowed(&self) -> bool {
        match (self.params, self.settings) {
            (Some(p), _) => p.windowed,
            (None, Some(s)) => s.windowed,
            (None, None) => true,
        }
    }

    /// Toggles fullscreen/windowed, running the full lost/reset cycle.
    pub fn set_windowed(&mut self, windowed: bool) -> Result<(), DeviceError> {
        let Some(mut settings) = self.settings else {
            return Err(DeviceError::NotInitialized);
        };
        if settings.windowed == windowed {
            return Ok(());
        }

        settings.windowed = windowed;
        self.settings = Some(settings);
        log::info!("switching to {}", if windowed { "windowed" } else { "fullscreen" });

        self.apply_rebuilt_params()
    }

    /// Records a new client size; windowed devices are reset to match it.
    ///
    /// A zero-sized (minimized) window never triggers a reset.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), DeviceError> {
        if width == 0 || height == 0 {
            log::debug!("ignoring resize to {width}x{height}");
            return Ok(());
        }
        self.client_size = Some((width, height));

        if !self.windowed() {
            return Ok(());
        }
        self.apply_rebuilt_params()
    }

    /// Window focus notification; doubles as a probe point.
    pub fn focus_changed(&mut self, focused: bool) -> Result<DeviceState, DeviceError> {
        self.focused = focused;
        log::debug!("focus {}", if focused { "gained" } else { "lost" });
        self.probe()
    }

    /// Polls the device and advances the state machine.
    pub fn probe(&mut self) -> Result<DeviceState, DeviceError> {
        match self.state {
            DeviceState::Uninitialized => return Ok(self.state),
            DeviceState::Destroyed => return Err(DeviceError::Destroyed),
            _ => {}
        }

        let status = match self.backend.cooperative_level() {
            Ok(status) => status,
            Err(code) => {
                log::error!("device probe failed: {code}");
                self.destroy();
                return Err(DeviceError::DriverFailed(code));
            }
        };

        match (status, self.state) {
            (DeviceStatus::Operational, DeviceState::Created) => {
                self.activate()?;
                Ok(self.state)
            }
            (DeviceStatus::Operational, DeviceState::Active) => Ok(self.state),
            // Recovered without our help (e.g. a restored window); rebuild anyway.
            (DeviceStatus::Operational, _) | (DeviceStatus::NotReset, _) => self.try_reset(),
            (DeviceStatus::Lost, DeviceState::Lost) => Ok(self.state),
            (DeviceStatus::Lost, _) => {
                self.enter_lost()?;
                Ok(self.state)
            }
        }
    }

    /// Flushes pending draws, presents the primary swap chain, then probes.
    ///
    /// A fullscreen device whose window lost focus flushes but does not
    /// present; it resumes once focus comes back.
    pub fn present(&mut self) -> Result<DeviceState, DeviceError> {
        match self.state {
            DeviceState::Destroyed => return Err(DeviceError::Destroyed),
            DeviceState::Active => {
                self.flush();
                if self.focused || self.windowed() {
                    self.backend.present(None);
                } else {
                    log::debug!("fullscreen window not focused; present skipped");
                }
            }
            _ => {}
        }
        self.probe()
    }

    /// Releases every resource, then the device. Idempotent.
    pub fn shutdown(&mut self) -> Result<(), DeviceError> {
        if self.state == DeviceState::Destroyed {
            return Ok(());
        }
        log::info!("shutting down device ({})", self.state);

        self.drop_bindings();
        let released = self.registry.notify_force_release(self.backend.as_mut());
        if self.state.is_live() {
            self.backend.release_device();
        }
        self.state = DeviceState::Destroyed;
        released
    }

    fn destroy(&mut self) {
        if let Err(e) = self.shutdown() {
            log::warn!("resource release during teardown failed: {e}");
        }
    }

    fn create(&mut self, params: PresentationParameters) -> Result<(), DeviceError> {
        if let Err(code) = self.backend.create_device(&params) {
            log::error!("device creation failed: {code}");
            return Err(DeviceError::CannotCreate(code));
        }
        self.params = Some(params);
        self.state = DeviceState::Created;
        log::info!("device created");

        self.activate()
    }

    /// Rebuilds parameters from the stored settings and resets if they changed.
    fn apply_rebuilt_params(&mut self) -> Result<(), DeviceError> {
        let params = self.build_params()?;
        if self.params == Some(params) {
            log::debug!("presentation parameters unchanged; reset skipped");
            return Ok(());
        }
        self.params = Some(params);

        match self.state {
            DeviceState::Created | DeviceState::Active => self.reconfigure(),
            // Picked up by the next reset, or by set_mode.
            _ => Ok(()),
        }
    }

    /// Deliberate lost/reset cycle for a configuration change.
    fn reconfigure(&mut self) -> Result<(), DeviceError> {
        self.flush();
        self.try_reset().map(|_| ())
    }

    fn enter_lost(&mut self) -> Result<(), DeviceError> {
        if self.state != DeviceState::Lost {
            log::info!("device lost ({})", self.state);
        }
        self.state = DeviceState::Lost;
        self.drop_bindings();

        if self.lost_notified {
            return Ok(());
        }
        self.lost_notified = true;
        self.registry.notify_lost(self.backend.as_mut())
    }

    fn try_reset(&mut self) -> Result<DeviceState, DeviceError> {
        // Resources busy when the loss was announced release their handles now,
        // while those handles still belong to the device being reset.
        let released = if self.lost_notified {
            self.registry.retry_lost(self.backend.as_mut())
        } else {
            self.enter_lost()
        };

        self.state = DeviceState::Resetting;
        let params = self.build_params()?;
        self.params = Some(params);
        self.reset_attempts += 1;

        log::info!(
            "resetting device to {}x{} windowed={} (attempt {})",
            params.back_buffer_width,
            params.back_buffer_height,
            params.windowed,
            self.reset_attempts,
        );

        match self.backend.reset(&params) {
            Ok(ResetOutcome::Ready) => {
                self.activate()?;
                released.map(|_| self.state)
            }
            Ok(ResetOutcome::NotReady) => {
                let attempts = self.reset_attempts;
                if self
                    .config
                    .max_reset_attempts
                    .is_some_and(|max| attempts >= max)
                {
                    log::error!("device still not ready after {attempts} reset attempts");
                    self.destroy();
                    return Err(DeviceError::ResetRetriesExhausted { attempts });
                }
                log::debug!("device not ready for reset; retrying on next probe");
                released.map(|_| self.state)
            }
            Err(code) => {
                log::error!("device reset failed: {code}");
                self.destroy();
                Err(DeviceError::ResetFailed(code))
            }
        }
    }

    /// Acquires the primary buffers, reapplies default state, and rebuilds resources.
    fn activate(&mut self) -> Result<(), DeviceError> {
        let back_buffer = self.backend.back_buffer()?;
        self.back_buffer = Some(back_buffer);
        self.depth_buffer = self.backend.auto_depth_stencil();

        self.backend.set_render_target(
            back_buffer.handle,
            self.depth_buffer.map(|d| d.handle),
            Viewport::full(back_buffer.width, back_buffer.height),
        );

        // The device forgets fixed-function state across a reset.
        let defaults = BatchState::new(self.config.default_render_state, None);
        self.backend.apply_render_state(&defaults);
        self.batcher.invalidate_applied();
        self.batcher.mark_applied(defaults);

        self.state = DeviceState::Active;
        self.lost_notified = false;
        self.reset_attempts = 0;
        log::info!(
            "device active at {}x{}",
            back_buffer.width,
            back_buffer.height
        );

        self.registry.notify_reset(self.backend.as_mut())
    }

    fn drop_bindings(&mut self) {
        self.batcher.discard();
        self.active = None;
        self.active_session = false;
        self.previous = None;
        self.back_buffer = None;
        self.depth_buffer = None;
    }

    /// Presentation parameters for the stored settings and current window.
    fn build_params(&self) -> Result<PresentationParameters, DeviceError> {
        let settings = self.settings.ok_or(DeviceError::NotInitialized)?;
        let caps = self.backend.capabilities();

        let mut request = PresentRequest {
            mode: settings.mode,
            windowed: settings.windowed,
            resize: None,
            preserve_back_buffer: self.config.preserve_back_buffer,
            use_depth: settings.use_depth,
            use_stencil: settings.use_stencil,
            vsync: settings.vsync,
            window_kind: self.config.window_kind,
            render_windows: self.render_windows(),
        };

        let params = super::build_presentation_parameters(&request, caps);
        if !params.windowed || self.client_size.is_none() {
            return Ok(params);
        }

        // Windowed back buffers follow the client area.
        request.resize = self.client_size;
        Ok(super::build_presentation_parameters(&request, caps))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::coords::Color;
    use crate::device::recording::{Call, Recorder, RecordingBackend};
    use crate::device::{
        DepthStencilFormat, DeviceConfig, DeviceResource, GpuBackend, PixelFormat, Registration,
        ResultCode, ResultKind, TargetBinding, WindowKind,
    };
    use crate::render::{PrimitiveStyle, RenderStateBlock, Vertex};
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Tracker {
        events: Vec<&'static str>,
        registration: Option<Registration>,
        fail_reset: bool,
    }

    impl DeviceResource for Tracker {
        fn on_device_lost(&mut self, _gpu: &mut dyn GpuBackend) -> Result<(), DeviceError> {
            self.events.push("lost");
            Ok(())
        }

        fn on_device_reset(&mut self, _gpu: &mut dyn GpuBackend) -> Result<(), DeviceError> {
            self.events.push("reset");
            if self.fail_reset {
                return Err(ResultCode::new(ResultKind::OutOfVideoMemory, "tracker").into());
            }
            Ok(())
        }

        fn force_release(&mut self, _gpu: &mut dyn GpuBackend) -> Result<(), DeviceError> {
            self.events.push("release");
            Ok(())
        }
    }

    fn context(config: DeviceConfig) -> (DeviceContext, Recorder) {
        let (backend, rec) = RecordingBackend::new();
        (DeviceContext::new(Box::new(backend), config), rec)
    }

    fn track(ctx: &DeviceContext) -> Rc<RefCell<Tracker>> {
        let tracker = Rc::new(RefCell::new(Tracker::default()));
        let dyn_rc: Rc<RefCell<dyn DeviceResource>> = tracker.clone();
        let reg = ctx.registry().register(&dyn_rc);
        tracker.borrow_mut().registration = Some(reg);
        tracker
    }

    fn mode(w: u32, h: u32) -> VideoMode {
        VideoMode::new(w, h, PixelFormat::X8R8G8B8)
    }

    fn start(ctx: &mut DeviceContext) {
        ctx.set_mode(mode(800, 600), true, false, false, false, VsyncInterval::One)
            .unwrap();
    }

    fn back_buffer_binding(ctx: &DeviceContext, tracker: &Rc<RefCell<Tracker>>) -> TargetBinding {
        let bb = ctx.back_buffer.expect("device is active");
        TargetBinding {
            id: tracker.borrow().registration.as_ref().unwrap().id(),
            color: bb.handle,
            depth: None,
            viewport: Viewport::full(bb.width, bb.height),
        }
    }

    fn point() -> Vertex {
        Vertex::new(1.0, 1.0, 0.0, Color::WHITE, [0.0, 0.0])
    }

    fn defaults() -> BatchState {
        BatchState::new(RenderStateBlock::default(), None)
    }

    #[test]
    fn mode_set_then_resize_ends_active_with_client_size() {
        let (mut ctx, rec) = context(DeviceConfig::default());

        ctx.set_mode(mode(1280, 720), true, true, false, false, VsyncInterval::Immediate)
            .unwrap();
        ctx.resize(1024, 600).unwrap();

        let p = *ctx.params().unwrap();
        assert_eq!((p.back_buffer_width, p.back_buffer_height), (1024, 600));
        assert!(p.windowed);
        assert_ne!(p.auto_depth_stencil_format, DepthStencilFormat::None);
        assert_eq!(ctx.state(), DeviceState::Active);
        assert_eq!(ctx.back_buffer_size(), Some((1024, 600)));
        assert_eq!(rec.count(|c| matches!(c, Call::Reset { .. })), 1);
    }

    #[test]
    fn lost_then_ready_cycle_recovers_and_accepts_draws() {
        let (mut ctx, rec) = context(DeviceConfig::default());
        let tracker = track(&ctx);
        start(&mut ctx);

        rec.set_status(DeviceStatus::Lost);
        assert_eq!(ctx.probe().unwrap(), DeviceState::Lost);

        // Dropped while lost: no target switch, no batch, no draw.
        let stale = TargetBinding {
            id: tracker.borrow().registration.as_ref().unwrap().id(),
            color: crate::device::GpuHandle::new(1),
            depth: None,
            viewport: Viewport::full(800, 600),
        };
        assert!(!ctx.draw_to(stale, &[point()], PrimitiveStyle::PointList, defaults()));
        assert!(ctx.batcher().batch().is_empty());

        rec.set_status(DeviceStatus::NotReset);
        assert_eq!(ctx.probe().unwrap(), DeviceState::Active);

        let binding = back_buffer_binding(&ctx, &tracker);
        assert!(ctx.draw_to(binding, &[point()], PrimitiveStyle::PointList, defaults()));
        assert!(ctx.flush());

        assert_eq!(rec.draw_count(), 1);
        assert_eq!(tracker.borrow().events, vec!["reset", "lost", "reset"]);
    }

    #[test]
    fn default_state_is_reapplied_after_every_reset() {
        let (mut ctx, rec) = context(DeviceConfig::default());
        start(&mut ctx);
        rec.set_status(DeviceStatus::NotReset);
        ctx.probe().unwrap();

        assert_eq!(rec.state_applications(), vec![defaults(), defaults()]);
    }

    #[test]
    fn not_ready_reset_stays_resetting_and_retries() {
        let (mut ctx, rec) = context(DeviceConfig::default());
        let tracker = track(&ctx);
        start(&mut ctx);

        rec.set_status(DeviceStatus::NotReset);
        rec.script_reset(Ok(ResetOutcome::NotReady));
        assert_eq!(ctx.probe().unwrap(), DeviceState::Resetting);
        assert!(!ctx.is_drawable());

        assert_eq!(ctx.probe().unwrap(), DeviceState::Active);
        // Released once even though two resets were needed.
        assert_eq!(tracker.borrow().events, vec!["reset", "lost", "reset"]);
    }

    #[test]
    fn retry_bound_destroys_the_device() {
        let config = DeviceConfig {
            max_reset_attempts: Some(2),
            ..DeviceConfig::default()
        };
        let (mut ctx, rec) = context(config);
        start(&mut ctx);

        rec.set_status(DeviceStatus::NotReset);
        rec.script_reset(Ok(ResetOutcome::NotReady));
        rec.script_reset(Ok(ResetOutcome::NotReady));

        assert_eq!(ctx.probe().unwrap(), DeviceState::Resetting);
        let err = ctx.probe().unwrap_err();
        assert!(matches!(err, DeviceError::ResetRetriesExhausted { attempts: 2 }));
        assert_eq!(ctx.state(), DeviceState::Destroyed);
        assert!(matches!(ctx.probe(), Err(DeviceError::Destroyed)));
    }

    #[test]
    fn driver_error_during_reset_is_fatal() {
        let (mut ctx, rec) = context(DeviceConfig::default());
        let tracker = track(&ctx);
        start(&mut ctx);

        rec.set_status(DeviceStatus::NotReset);
        rec.script_reset(Err(ResultCode::new(ResultKind::DriverInternalError, "hung")));

        let err = ctx.probe().unwrap_err();
        assert!(matches!(err, DeviceError::ResetFailed(_)));
        assert!(err.is_fatal());
        assert_eq!(ctx.state(), DeviceState::Destroyed);
        assert_eq!(tracker.borrow().events, vec!["reset", "lost", "release"]);
    }

    #[test]
    fn probe_driver_failure_destroys_from_active() {
        let (mut ctx, rec) = context(DeviceConfig::default());
        start(&mut ctx);

        rec.fail_driver(ResultCode::new(ResultKind::DriverInternalError, "gone"));
        let err = ctx.probe().unwrap_err();
        assert!(matches!(err, DeviceError::DriverFailed(_)));
        assert_eq!(ctx.state(), DeviceState::Destroyed);
    }

    #[test]
    fn creation_failure_leaves_context_uninitialized() {
        let (mut ctx, rec) = context(DeviceConfig::default());
        rec.fail_next_create(ResultCode::new(ResultKind::CannotCreate, "no adapter"));

        let err = ctx
            .set_mode(mode(800, 600), true, false, false, false, VsyncInterval::One)
            .unwrap_err();
        assert!(matches!(err, DeviceError::CannotCreate(_)));
        assert_eq!(ctx.state(), DeviceState::Uninitialized);

        start(&mut ctx);
        assert_eq!(ctx.state(), DeviceState::Active);
    }

    #[test]
    fn unchanged_mode_skips_reset_unless_forced() {
        let (mut ctx, rec) = context(DeviceConfig::default());
        start(&mut ctx);

        start(&mut ctx);
        assert_eq!(rec.count(|c| matches!(c, Call::Reset { .. })), 0);

        ctx.set_mode(mode(800, 600), true, false, false, true, VsyncInterval::One)
            .unwrap();
        assert_eq!(rec.count(|c| matches!(c, Call::Reset { .. })), 1);
    }

    #[test]
    fn fullscreen_toggle_runs_a_reset_cycle() {
        let (mut ctx, rec) = context(DeviceConfig::default());
        start(&mut ctx);

        ctx.set_windowed(false).unwrap();
        assert!(!ctx.windowed());
        assert_eq!(
            rec.count(|c| matches!(c, Call::Reset { .. })),
            rec.count(|c| *c == Call::Reset { width: 800, height: 600, windowed: false })
        );
        assert_eq!(rec.count(|c| matches!(c, Call::Reset { .. })), 1);
        assert_eq!(ctx.state(), DeviceState::Active);
    }

    #[test]
    fn failing_resource_reset_is_reported_but_the_device_stays_active() {
        let (mut ctx, rec) = context(DeviceConfig::default());
        let tracker = track(&ctx);
        start(&mut ctx);
        tracker.borrow_mut().fail_reset = true;

        rec.set_status(DeviceStatus::NotReset);
        let err = ctx.probe().unwrap_err();
        assert!(matches!(
            err,
            DeviceError::Driver(ref rc) if rc.kind == ResultKind::OutOfVideoMemory
        ));
        assert_eq!(ctx.state(), DeviceState::Active);
        assert!(ctx.is_drawable());
        assert_eq!(tracker.borrow().events, vec!["reset", "lost", "reset"]);

        // Nothing left to report on the next probe.
        assert_eq!(ctx.probe().unwrap(), DeviceState::Active);
    }

    #[test]
    fn unfocused_fullscreen_device_skips_present() {
        let (mut ctx, rec) = context(DeviceConfig::default());
        ctx.set_mode(mode(800, 600), false, false, false, false, VsyncInterval::One)
            .unwrap();
        assert!(!ctx.windowed());

        ctx.focus_changed(false).unwrap();
        assert!(!ctx.is_focused());
        assert_eq!(ctx.present().unwrap(), DeviceState::Active);
        assert_eq!(rec.count(|c| matches!(c, Call::Present(_))), 0);

        ctx.focus_changed(true).unwrap();
        ctx.present().unwrap();
        assert_eq!(rec.count(|c| matches!(c, Call::Present(None))), 1);
    }

    #[test]
    fn unfocused_windowed_device_keeps_presenting() {
        let (mut ctx, rec) = context(DeviceConfig::default());
        start(&mut ctx);

        ctx.focus_changed(false).unwrap();
        ctx.present().unwrap();
        assert_eq!(rec.count(|c| matches!(c, Call::Present(None))), 1);
    }

    #[test]
    fn child_control_stays_windowed_without_error() {
        let config = DeviceConfig {
            window_kind: WindowKind::ChildControl,
            ..DeviceConfig::default()
        };
        let (mut ctx, rec) = context(config);

        ctx.set_mode(mode(800, 600), false, false, false, false, VsyncInterval::One)
            .unwrap();
        assert!(ctx.windowed());

        ctx.set_windowed(true).unwrap();
        ctx.set_windowed(false).unwrap();
        assert!(ctx.windowed());
        assert_eq!(rec.count(|c| matches!(c, Call::Reset { .. })), 0);
    }

    #[test]
    fn fullscreen_resize_does_not_reset() {
        let (mut ctx, rec) = context(DeviceConfig::default());
        ctx.set_mode(mode(1024, 768), false, false, false, false, VsyncInterval::One)
            .unwrap();

        ctx.resize(640, 480).unwrap();
        assert_eq!(rec.count(|c| matches!(c, Call::Reset { .. })), 0);
        assert_eq!(ctx.params().unwrap().back_buffer_width, 1024);
    }

    #[test]
    fn shutdown_releases_resources_before_the_device() {
        let (mut ctx, rec) = context(DeviceConfig::default());
        let tracker = track(&ctx);
        start(&mut ctx);
        rec.clear_calls();

        ctx.shutdown().unwrap();
        assert_eq!(ctx.state(), DeviceState::Destroyed);
        assert_eq!(tracker.borrow().events.last(), Some(&"release"));
        assert_eq!(rec.calls(), vec![Call::ReleaseDevice]);

        // Second shutdown and the drop are no-ops.
        ctx.shutdown().unwrap();
        drop(ctx);
        assert_eq!(rec.count(|c| *c == Call::ReleaseDevice), 1);
    }

    #[test]
    fn mode_requested_while_lost_applies_on_next_reset() {
        let (mut ctx, rec) = context(DeviceConfig::default());
        start(&mut ctx);

        rec.set_status(DeviceStatus::Lost);
        ctx.probe().unwrap();
        ctx.set_mode(mode(1024, 768), true, false, false, false, VsyncInterval::One)
            .unwrap();
        assert_eq!(ctx.state(), DeviceState::Lost);

        rec.set_status(DeviceStatus::NotReset);
        ctx.probe().unwrap();
        assert_eq!(ctx.back_buffer_size(), Some((1024, 768)));
    }

    #[test]
    fn calls_before_set_mode_report_not_initialized() {
        let (mut ctx, _rec) = context(DeviceConfig::default());
        assert!(matches!(ctx.set_windowed(false), Err(DeviceError::NotInitialized)));
        assert_eq!(ctx.probe().unwrap(), DeviceState::Uninitialized);
        assert!(ctx.windowed());
    }
}
