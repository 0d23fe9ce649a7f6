use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{StartCause, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App, AppControl, FrameClock, FrameCtx, FrameTime};
use crate::device::{
    BackendConfig, DeviceConfig, DeviceContext, DeviceError, DeviceState, PixelFormat, VideoMode,
    VsyncInterval, WgpuBackend,
};
use crate::render::{RenderSurface, SharedSurface};

/// How often a lost device is probed while nothing can be drawn.
const LOST_PROBE_INTERVAL: Duration = Duration::from_millis(100);

/// Window and initial video mode configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    /// Initial mode; in windowed mode also the initial client size.
    pub mode: VideoMode,
    pub windowed: bool,
    pub use_depth: bool,
    pub use_stencil: bool,
    pub vsync: VsyncInterval,
    pub device: DeviceConfig,
    pub backend: BackendConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "lazarus".to_string(),
            mode: VideoMode::new(1280, 720, PixelFormat::X8R8G8B8),
            windowed: true,
            use_depth: false,
            use_stencil: false,
            vsync: VsyncInterval::One,
            device: DeviceConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the window, creates the device and drives `app` until it exits.
    ///
    /// Returns the error that stopped the loop, if any.
    pub fn run<A>(config: RuntimeConfig, app: A) -> Result<()>
    where
        A: 'static + App,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

struct WindowEntry {
    window: Arc<Window>,
    device: DeviceContext,
    primary: SharedSurface,
    clock: FrameClock,
    last_time: FrameTime,
}

impl WindowEntry {
    fn ctx(&mut self, time: FrameTime) -> FrameCtx<'_> {
        FrameCtx {
            window: &self.window,
            device: &mut self.device,
            primary: &self.primary,
            time,
        }
    }
}

struct AppState<A>
where
    A: App + 'static,
{
    config: RuntimeConfig,
    app: A,
    entry: Option<WindowEntry>,
    failure: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: App + 'static,
{
    fn new(config: RuntimeConfig, app: A) -> Self {
        Self {
            config,
            app,
            entry: None,
            failure: None,
        }
    }

    fn create_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let cfg = &self.config;
        let attrs = Window::default_attributes()
            .with_title(cfg.title.clone())
            .with_inner_size(PhysicalSize::new(cfg.mode.width, cfg.mode.height));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let backend = pollster::block_on(WgpuBackend::new(window.clone(), cfg.backend.clone()))
            .context("GPU initialization failed")?;
        let mut device = DeviceContext::new(Box::new(backend), cfg.device.clone());
        device
            .set_mode(cfg.mode, cfg.windowed, cfg.use_depth, cfg.use_stencil, false, cfg.vsync)
            .context("initial set_mode failed")?;
        let primary = RenderSurface::primary(&mut device).context("failed to attach primary surface")?;

        let mut clock = FrameClock::new();
        let last_time = clock.tick();
        let mut entry = WindowEntry {
            window,
            device,
            primary,
            clock,
            last_time,
        };
        self.app
            .init(&mut entry.ctx(last_time))
            .context("application init failed")?;

        self.entry = Some(entry);
        Ok(())
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut entry) = self.entry.take() {
            let time = entry.last_time;
            self.app.on_exit(&mut entry.ctx(time));
            if let Err(err) = entry.device.shutdown() {
                log::warn!("device shutdown reported: {err}");
            }
        }
        event_loop.exit();
    }

    /// Routes a device result: fatal errors stop the loop, others are logged.
    fn check<T>(&mut self, event_loop: &ActiveEventLoop, result: Result<T, DeviceError>) {
        match result {
            Ok(_) => {}
            Err(err) if err.is_fatal() => {
                log::error!("device failure: {err}");
                self.failure = Some(anyhow::Error::new(err).context("graphics device failed"));
                self.shutdown(event_loop);
            }
            Err(err) => log::warn!("device call failed: {err}"),
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(entry) = self.entry.as_mut() else { return };

        if !entry.device.is_drawable() {
            entry.clock.reset();
            let result = entry.device.probe();
            self.check(event_loop, result);
            return;
        }

        let time = entry.clock.tick();
        entry.last_time = time;
        if self.app.on_frame(&mut entry.ctx(time)) == AppControl::Exit {
            self.shutdown(event_loop);
            return;
        }

        let result = entry.device.present();
        if let Ok(state) = &result {
            if *state != DeviceState::Active {
                log::debug!("device {state} after present");
            }
        }
        self.check(event_loop, result);
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: App + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        if let Err(e) = self.create_entry(event_loop) {
            log::error!("failed to start: {e:#}");
            self.failure = Some(e);
            event_loop.exit();
        }
    }

    fn new_events(&mut self, event_loop: &ActiveEventLoop, cause: StartCause) {
        if let StartCause::ResumeTimeReached { .. } = cause {
            let Some(entry) = self.entry.as_mut() else { return };
            let result = entry.device.probe();
            self.check(event_loop, result);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(entry) = self.entry.as_ref() else { return };

        if entry.device.is_drawable() {
            event_loop.set_control_flow(ControlFlow::Wait);
            entry.window.request_redraw();
        } else {
            event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + LOST_PROBE_INTERVAL));
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(entry) = self.entry.as_mut() else { return };
        if entry.window.id() != window_id {
            return;
        }

        let time = entry.last_time;
        if self.app.on_window_event(&mut entry.ctx(time), &event) == AppControl::Exit {
            self.shutdown(event_loop);
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),

            WindowEvent::Resized(size) => {
                let result = entry.device.resize(size.width, size.height);
                self.check(event_loop, result);
            }

            WindowEvent::Focused(focused) => {
                let result = entry.device.focus_changed(focused);
                self.check(event_loop, result);
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }
}
