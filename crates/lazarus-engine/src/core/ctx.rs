use std::time::{Duration, Instant};

use winit::window::Window;

use crate::device::DeviceContext;
use crate::render::SharedSurface;

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped to `[0.0001, 0.25]`.
    pub dt: f32,
    pub now: Instant,
    pub frame_index: u64,
}

/// Produces `FrameTime` snapshots, one tick per drawn frame.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
}

impl FrameClock {
    const DT_MIN: Duration = Duration::from_micros(100);
    const DT_MAX: Duration = Duration::from_millis(250);

    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            frame_index: 0,
        }
    }

    /// Restarts the delta baseline, e.g. after the device was lost for a while.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(Self::DT_MIN, Self::DT_MAX);
        self.last = now;

        let time = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        time
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Context handed to `App` callbacks.
pub struct FrameCtx<'a> {
    pub window: &'a Window,
    pub device: &'a mut DeviceContext,
    /// Surface drawing into the primary back buffer.
    pub primary: &'a SharedSurface,
    pub time: FrameTime,
}

impl FrameCtx<'_> {
    /// Client size in physical pixels.
    pub fn window_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_counts_frames_and_clamps_delta() {
        let mut clock = FrameClock::new();
        let a = clock.tick();
        let b = clock.tick();
        assert_eq!(a.frame_index, 0);
        assert_eq!(b.frame_index, 1);
        assert!(b.dt >= 0.0001 && b.dt <= 0.25);

        if let Some(stalled) = Instant::now().checked_sub(Duration::from_secs(5)) {
            clock.last = stalled;
            assert_eq!(clock.tick().dt, 0.25);
        }
    }
}
