use super::{DepthStencilFormat, PixelFormat, VideoMode, VsyncInterval};

/// Read-only adapter capability lookups.
///
/// This is the video-mode enumeration service consumed by the presentation
/// parameter builder. Implementations must not change answers while a
/// `build` call is in progress.
pub trait AdapterCaps {
    /// Fullscreen modes the adapter can display.
    fn display_modes(&self) -> &[VideoMode];

    /// Current desktop mode, used as the windowed fallback format.
    fn desktop_mode(&self) -> VideoMode;

    /// Whether `interval` can be honoured in fullscreen.
    fn supports_vsync(&self, interval: VsyncInterval) -> bool;

    /// Whether `format` can be used as a depth buffer next to `back_buffer`.
    fn supports_depth_format(&self, format: DepthStencilFormat, back_buffer: PixelFormat) -> bool;

    /// Whether a windowed back buffer of `format` can be presented on the desktop.
    fn supports_windowed_format(&self, format: PixelFormat) -> bool;
}

/// Capability table filled once from the adapter (or by hand in headless runs).
#[derive(Debug, Clone)]
pub struct StaticCaps {
    pub modes: Vec<VideoMode>,
    pub desktop: VideoMode,
    pub vsync_intervals: Vec<VsyncInterval>,
    pub depth_formats: Vec<DepthStencilFormat>,
    pub windowed_formats: Vec<PixelFormat>,
}

impl Default for StaticCaps {
    /// A typical desktop adapter: 32-bit modes, vsync 1, 24-bit depth with stencil.
    fn default() -> Self {
        let desktop = VideoMode::new(1920, 1080, PixelFormat::X8R8G8B8).with_refresh_rate(60);
        Self {
            modes: vec![
                VideoMode::new(640, 480, PixelFormat::X8R8G8B8).with_refresh_rate(60),
                VideoMode::new(800, 600, PixelFormat::X8R8G8B8).with_refresh_rate(60),
                VideoMode::new(1024, 768, PixelFormat::X8R8G8B8).with_refresh_rate(60),
                VideoMode::new(1280, 720, PixelFormat::X8R8G8B8).with_refresh_rate(60),
                desktop,
            ],
            desktop,
            vsync_intervals: vec![VsyncInterval::Immediate, VsyncInterval::One],
            depth_formats: vec![
                DepthStencilFormat::D16,
                DepthStencilFormat::D24X8,
                DepthStencilFormat::D24S8,
            ],
            windowed_formats: vec![PixelFormat::X8R8G8B8, PixelFormat::A8R8G8B8],
        }
    }
}

impl AdapterCaps for StaticCaps {
    fn display_modes(&self) -> &[VideoMode] {
        &self.modes
    }

    fn desktop_mode(&self) -> VideoMode {
        self.desktop
    }

    fn supports_vsync(&self, interval: VsyncInterval) -> bool {
        self.vsync_intervals.contains(&interval)
    }

    fn supports_depth_format(&self, format: DepthStencilFormat, _back_buffer: PixelFormat) -> bool {
        self.depth_formats.contains(&format)
    }

    fn supports_windowed_format(&self, format: PixelFormat) -> bool {
        self.windowed_formats.contains(&format)
    }
}
