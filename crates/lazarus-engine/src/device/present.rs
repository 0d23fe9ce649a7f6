use super::{AdapterCaps, DepthStencilFormat, PixelFormat, VideoMode, VsyncInterval};

/// Smallest back-buffer edge the builder will produce.
pub const MIN_BACK_BUFFER_DIM: u32 = 32;

/// Swap-chain depth used with `SwapEffect::Discard`.
pub const DISCARD_BACK_BUFFER_COUNT: u32 = 3;

/// What the device presents into.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum WindowKind {
    /// A top-level window; exclusive fullscreen is allowed.
    TopLevel,
    /// A child control embedded in another window; always windowed.
    ChildControl,
}

/// How back-buffer contents are treated after present.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SwapEffect {
    /// Contents are undefined after present; allows a deeper chain.
    Discard,
    /// Contents are preserved; forces a single back buffer.
    Copy,
}

/// Swap-chain parameters derived from a mode request and the window state.
///
/// Rebuilt on every mode change, resize, or windowed toggle; never mutated.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PresentationParameters {
    pub back_buffer_width: u32,
    pub back_buffer_height: u32,
    pub back_buffer_format: PixelFormat,
    pub back_buffer_count: u32,
    pub swap_effect: SwapEffect,
    pub windowed: bool,
    pub window_kind: WindowKind,
    pub auto_depth_stencil_format: DepthStencilFormat,
    /// Hz; 0 in windowed mode (desktop rate).
    pub refresh_rate: u32,
    pub presentation_interval: VsyncInterval,
}

/// Input to [`build`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PresentRequest {
    pub mode: VideoMode,
    pub windowed: bool,
    /// Client size reported by a resize event; `None` uses the mode size.
    pub resize: Option<(u32, u32)>,
    pub preserve_back_buffer: bool,
    pub use_depth: bool,
    pub use_stencil: bool,
    pub vsync: VsyncInterval,
    pub window_kind: WindowKind,
    /// Number of render-target windows currently alive, including the primary one.
    pub render_windows: usize,
}

/// Builds presentation parameters for `request`.
///
/// Pure apart from the read-only `caps` lookups. Fullscreen and vsync requests
/// that cannot be honoured are downgraded, never rejected.
pub fn build(request: &PresentRequest, caps: &dyn AdapterCaps) -> PresentationParameters {
    let (width, height) = request
        .resize
        .unwrap_or((request.mode.width, request.mode.height));

    let windowed = effective_windowed(request);

    let (swap_effect, back_buffer_count) = if request.preserve_back_buffer {
        (SwapEffect::Copy, 1)
    } else {
        (SwapEffect::Discard, DISCARD_BACK_BUFFER_COUNT)
    };

    let back_buffer_format = if windowed && !caps.supports_windowed_format(request.mode.format) {
        let desktop = caps.desktop_mode().format;
        log::debug!(
            "{:?} is not presentable on the desktop; using {:?}",
            request.mode.format,
            desktop
        );
        desktop
    } else {
        request.mode.format
    };

    let presentation_interval = if windowed {
        VsyncInterval::Immediate
    } else if caps.supports_vsync(request.vsync) {
        request.vsync
    } else {
        log::debug!("vsync {:?} unsupported; presenting immediately", request.vsync);
        VsyncInterval::Immediate
    };

    let auto_depth_stencil_format = select_depth_stencil_format(
        request.use_depth,
        request.use_stencil,
        back_buffer_format,
        caps,
    );

    PresentationParameters {
        back_buffer_width: width.max(MIN_BACK_BUFFER_DIM),
        back_buffer_height: height.max(MIN_BACK_BUFFER_DIM),
        back_buffer_format,
        back_buffer_count,
        swap_effect,
        windowed,
        window_kind: request.window_kind,
        auto_depth_stencil_format,
        refresh_rate: if windowed { 0 } else { request.mode.refresh_rate },
        presentation_interval,
    }
}

fn effective_windowed(request: &PresentRequest) -> bool {
    if request.windowed {
        return true;
    }
    if request.window_kind == WindowKind::ChildControl {
        log::debug!("fullscreen refused: target is a child control");
        return true;
    }
    if request.render_windows > 1 {
        log::debug!(
            "fullscreen refused: {} render windows exist",
            request.render_windows
        );
        return true;
    }
    false
}

/// Picks the first depth/stencil format the adapter supports for the request.
///
/// Returns `DepthStencilFormat::None` when neither depth nor stencil is wanted,
/// or when no candidate is supported.
pub fn select_depth_stencil_format(
    want_depth: bool,
    want_stencil: bool,
    back_buffer: PixelFormat,
    caps: &dyn AdapterCaps,
) -> DepthStencilFormat {
    use DepthStencilFormat as D;

    let candidates: &[DepthStencilFormat] = match (want_depth, want_stencil) {
        (false, false) => return D::None,
        (true, true) => &[D::D24S8, D::D24X4S4, D::D15S1],
        (true, false) => &[D::D24X8, D::D32, D::D16],
        (false, true) => &[D::D24S8, D::D15S1],
    };

    match candidates
        .iter()
        .copied()
        .find(|&f| caps.supports_depth_format(f, back_buffer))
    {
        Some(f) => f,
        None => {
            log::warn!(
                "no depth/stencil format for depth={want_depth} stencil={want_stencil}; running without"
            );
            D::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::StaticCaps;

    fn request(mode: VideoMode) -> PresentRequest {
        PresentRequest {
            mode,
            windowed: true,
            resize: None,
            preserve_back_buffer: false,
            use_depth: false,
            use_stencil: false,
            vsync: VsyncInterval::One,
            window_kind: WindowKind::TopLevel,
            render_windows: 1,
        }
    }

    fn mode(w: u32, h: u32) -> VideoMode {
        VideoMode::new(w, h, PixelFormat::X8R8G8B8).with_refresh_rate(60)
    }

    #[test]
    fn dimensions_are_clamped_to_minimum() {
        let caps = StaticCaps::default();
        for (w, h) in [(0, 0), (1, 500), (500, 31), (31, 31), (32, 1)] {
            let p = build(&request(mode(w, h)), &caps);
            assert!(p.back_buffer_width >= MIN_BACK_BUFFER_DIM, "{w}x{h}");
            assert!(p.back_buffer_height >= MIN_BACK_BUFFER_DIM, "{w}x{h}");
        }

        let mut req = request(mode(800, 600));
        req.resize = Some((10, 700));
        let p = build(&req, &caps);
        assert_eq!((p.back_buffer_width, p.back_buffer_height), (32, 700));
    }

    #[test]
    fn child_control_never_goes_fullscreen() {
        let caps = StaticCaps::default();
        let mut req = request(mode(1024, 768));
        req.windowed = false;
        req.window_kind = WindowKind::ChildControl;
        assert!(build(&req, &caps).windowed);
    }

    #[test]
    fn multiple_render_windows_force_windowed() {
        let caps = StaticCaps::default();
        let mut req = request(mode(1024, 768));
        req.windowed = false;
        req.render_windows = 2;
        assert!(build(&req, &caps).windowed);

        req.render_windows = 1;
        let p = build(&req, &caps);
        assert!(!p.windowed);
        assert_eq!(p.refresh_rate, 60);
    }

    #[test]
    fn preserved_back_buffer_uses_copy_with_single_buffer() {
        let caps = StaticCaps::default();
        let mut req = request(mode(800, 600));
        let p = build(&req, &caps);
        assert_eq!(p.swap_effect, SwapEffect::Discard);
        assert_eq!(p.back_buffer_count, DISCARD_BACK_BUFFER_COUNT);

        req.preserve_back_buffer = true;
        let p = build(&req, &caps);
        assert_eq!(p.swap_effect, SwapEffect::Copy);
        assert_eq!(p.back_buffer_count, 1);
    }

    #[test]
    fn vsync_is_immediate_when_windowed_or_unsupported() {
        let caps = StaticCaps::default();
        let mut req = request(mode(800, 600));
        assert_eq!(build(&req, &caps).presentation_interval, VsyncInterval::Immediate);

        req.windowed = false;
        assert_eq!(build(&req, &caps).presentation_interval, VsyncInterval::One);

        req.vsync = VsyncInterval::Three;
        assert_eq!(build(&req, &caps).presentation_interval, VsyncInterval::Immediate);
    }

    #[test]
    fn depth_stencil_selection_follows_request_and_caps() {
        let caps = StaticCaps::default();
        let fmt = PixelFormat::X8R8G8B8;
        assert_eq!(select_depth_stencil_format(false, false, fmt, &caps), DepthStencilFormat::None);
        assert_eq!(select_depth_stencil_format(true, false, fmt, &caps), DepthStencilFormat::D24X8);
        assert_eq!(select_depth_stencil_format(true, true, fmt, &caps), DepthStencilFormat::D24S8);

        let bare = StaticCaps {
            depth_formats: vec![DepthStencilFormat::D16],
            ..StaticCaps::default()
        };
        assert_eq!(select_depth_stencil_format(true, false, fmt, &bare), DepthStencilFormat::D16);
        assert_eq!(select_depth_stencil_format(true, true, fmt, &bare), DepthStencilFormat::None);
    }

    #[test]
    fn windowed_format_falls_back_to_desktop() {
        let caps = StaticCaps::default();
        let req = request(VideoMode::new(800, 600, PixelFormat::R5G6B5));
        assert_eq!(build(&req, &caps).back_buffer_format, PixelFormat::X8R8G8B8);
    }
}
