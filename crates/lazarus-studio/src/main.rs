use anyhow::Result;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use lazarus_engine::coords::{Color, Point, Rect};
use lazarus_engine::core::{App, AppControl, FrameCtx};
use lazarus_engine::device::{PixelFormat, VideoMode, VsyncInterval};
use lazarus_engine::logging::{init_logging, LoggingConfig};
use lazarus_engine::render::{BlendMode, PatternImage, RenderSurface, SharedPattern, SharedSurface};
use lazarus_engine::window::{Runtime, RuntimeConfig};

const BLEND_CYCLE: [BlendMode; 4] = [
    BlendMode::Alpha,
    BlendMode::Additive,
    BlendMode::Multiply,
    BlendMode::Opaque,
];

/// Primitive gallery.
///
/// Keys: F11 toggles fullscreen, V toggles vsync, B cycles blend modes, Esc quits.
#[derive(Default)]
struct Studio {
    pattern: Option<SharedPattern>,
    scratch: Option<SharedSurface>,
    blend: usize,
    t: f32,
}

impl Studio {
    fn on_key(&mut self, ctx: &mut FrameCtx<'_>, key: KeyCode) -> AppControl {
        match key {
            KeyCode::Escape => return AppControl::Exit,
            KeyCode::F11 => {
                let windowed = !ctx.device.windowed();
                if let Err(e) = ctx.device.set_windowed(windowed) {
                    log::error!("windowed toggle failed: {e}");
                }
            }
            KeyCode::KeyV => {
                if let Some(s) = ctx.device.settings().copied() {
                    let vsync = match s.vsync {
                        VsyncInterval::Immediate => VsyncInterval::One,
                        _ => VsyncInterval::Immediate,
                    };
                    log::info!("vsync {vsync:?}");
                    if let Err(e) =
                        ctx.device
                            .set_mode(s.mode, s.windowed, s.use_depth, s.use_stencil, false, vsync)
                    {
                        log::error!("vsync change failed: {e}");
                    }
                }
            }
            KeyCode::KeyB => {
                self.blend = (self.blend + 1) % BLEND_CYCLE.len();
                log::info!("blend {:?}", BLEND_CYCLE[self.blend]);
            }
            _ => {}
        }
        AppControl::Continue
    }

    /// Draws into the offscreen scratch target while the primary surface is
    /// active, exercising target nesting.
    fn draw_scratch(&self, ctx: &mut FrameCtx<'_>) {
        let Some(scratch) = &self.scratch else { return };
        let mut s = scratch.borrow_mut();
        if let Err(e) = s.begin_drawing(ctx.device) {
            log::warn!("scratch target unavailable: {e}");
            return;
        }
        if let Err(e) = s.clear_background(ctx.device) {
            log::warn!("scratch clear failed: {e}");
        }
        s.filled_circle(ctx.device, Point::new(64, 64), 48, Color::from_argb(0xFF30_80C0));
        s.end_drawing(ctx.device);
    }
}

impl App for Studio {
    fn init(&mut self, ctx: &mut FrameCtx<'_>) -> Result<()> {
        self.pattern = Some(PatternImage::checker(
            ctx.device,
            16,
            4,
            Color::WHITE,
            Color::from_argb(0xFF60_6060),
        )?);

        let scratch = RenderSurface::offscreen(ctx.device, 128, 128, true)?;
        scratch.borrow_mut().set_background(Color::from_argb(0xFF10_1820));
        self.scratch = Some(scratch);

        ctx.primary
            .borrow_mut()
            .set_background(Color::from_argb(0xFF1A_1A24));
        Ok(())
    }

    fn on_window_event(&mut self, ctx: &mut FrameCtx<'_>, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && !event.repeat =>
            {
                match event.physical_key {
                    PhysicalKey::Code(code) => self.on_key(ctx, code),
                    PhysicalKey::Unidentified(_) => AppControl::Continue,
                }
            }
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
        self.t += ctx.time.dt;

        let primary = ctx.primary.clone();
        let mut s = primary.borrow_mut();
        let dev = &mut *ctx.device;

        let mut state = *s.render_state();
        state.blend = BLEND_CYCLE[self.blend];
        s.set_render_state(state);

        if let Err(e) = s.clear_background(dev) {
            log::warn!("clear failed: {e}");
        }

        let (w, h) = (s.width() as i32, s.height() as i32);
        let wobble = (self.t * 2.0).sin();

        // Pixel grid of points.
        for y in (8..h.min(120)).step_by(8) {
            for x in (8..w.min(200)).step_by(8) {
                s.set_point(dev, Point::new(x, y), Color::from_argb(0xFF80_8080));
            }
        }

        // Lines fanning out from a corner, thin and thick.
        let origin = Point::new(220, 20);
        for i in 0..8 {
            let end = Point::new(220 + i * 24, 140);
            s.line(dev, origin, end, Color::from_argb(0xFFE0_C040));
        }
        s.line_with_width(
            dev,
            Point::new(420, 20),
            Point::new(420 + (80.0 * wobble) as i32, 140),
            Color::from_argb(0xFFE0_6040),
            5,
        );

        // Outlined and filled rectangles.
        s.rectangle(dev, Rect::new(20, 160, 160, 100), Color::WHITE);
        s.filled_rectangle(dev, Rect::new(30, 170, 140, 80), Color::new(0.2, 0.6, 0.3, 0.8));

        // Circles and ellipses.
        let r = 40 + (10.0 * wobble) as i32;
        s.circle(dev, Point::new(260, 210), r, Color::from_argb(0xFF40_C0E0));
        s.filled_circle(dev, Point::new(360, 210), 40, Color::new(0.9, 0.3, 0.5, 0.7));
        s.ellipse(dev, Point::new(480, 210), 60, 25 + r / 4, Color::from_argb(0xFFC0_A0FF));
        s.filled_ellipse(dev, Point::new(620, 210), 50, 30, Color::new(1.0, 0.8, 0.2, 0.6));

        // Patterned fill; the pattern scrolls with time.
        s.set_pattern(self.pattern.clone());
        s.set_pattern_offset(Point::new((self.t * 20.0) as i32, 0));
        s.filled_rectangle(dev, Rect::new(20, 290, w.clamp(40, 660) - 40, 80), Color::WHITE);
        s.set_pattern(None);

        drop(s);
        self.draw_scratch(ctx);

        AppControl::Continue
    }

    fn on_exit(&mut self, ctx: &mut FrameCtx<'_>) {
        if let Some(scratch) = self.scratch.take() {
            scratch.borrow_mut().release(ctx.device);
        }
        if let Some(pattern) = self.pattern.take() {
            pattern.borrow_mut().release(ctx.device);
        }
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "Lazarus Studio".to_string(),
        mode: VideoMode::new(800, 600, PixelFormat::X8R8G8B8),
        use_depth: true,
        ..RuntimeConfig::default()
    };

    Runtime::run(config, Studio::default())
}
