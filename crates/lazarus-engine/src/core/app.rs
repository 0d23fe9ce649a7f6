use anyhow::Result;
use winit::event::WindowEvent;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by `window::Runtime`.
pub trait App {
    /// Called once the device and the primary surface exist.
    ///
    /// Device resources (patterns, offscreen surfaces) are usually created here.
    fn init(&mut self, ctx: &mut FrameCtx<'_>) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Called for every window event before the runtime handles it.
    fn on_window_event(&mut self, ctx: &mut FrameCtx<'_>, event: &WindowEvent) -> AppControl {
        let _ = (ctx, event);
        AppControl::Continue
    }

    /// Called once per frame while the device is drawable. The runtime
    /// presents afterwards.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl;

    /// Called before the device shuts down; release explicit GPU resources here.
    fn on_exit(&mut self, ctx: &mut FrameCtx<'_>) {
        let _ = ctx;
    }
}
