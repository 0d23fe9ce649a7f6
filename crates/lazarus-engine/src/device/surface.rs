use super::{DepthStencilFormat, PixelFormat, VsyncInterval};

/// High-level response after a surface acquisition error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum SurfaceErrorAction {
    /// Surface must be reconfigured; the next probe reports a pending reset.
    Reconfigure,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM).
    Fatal,
}

pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if caps.formats.is_empty() {
        return None;
    }

    let preferred: &[wgpu::TextureFormat] = if prefer_srgb {
        &[
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ]
    } else {
        &[wgpu::TextureFormat::Bgra8Unorm, wgpu::TextureFormat::Rgba8Unorm]
    };
    for f in preferred {
        if caps.formats.contains(f) {
            return Some(*f);
        }
    }

    Some(caps.formats[0])
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Maps a presentation interval onto a present mode the surface supports.
///
/// Intervals above one have no wgpu equivalent and present on every vblank.
pub(crate) fn choose_present_mode(
    caps: &wgpu::SurfaceCapabilities,
    interval: VsyncInterval,
) -> wgpu::PresentMode {
    match interval {
        VsyncInterval::Immediate if caps.present_modes.contains(&wgpu::PresentMode::Immediate) => {
            wgpu::PresentMode::Immediate
        }
        VsyncInterval::Immediate => wgpu::PresentMode::AutoNoVsync,
        _ => wgpu::PresentMode::Fifo,
    }
}

pub(crate) fn map_surface_error(err: &wgpu::SurfaceError) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceErrorAction::Reconfigure,
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
        wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

/// Offscreen color format. 16-bit formats are widened; wgpu has no renderable 565/555.
pub(crate) fn color_texture_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::X8R8G8B8
        | PixelFormat::A8R8G8B8
        | PixelFormat::R5G6B5
        | PixelFormat::X1R5G5B5 => wgpu::TextureFormat::Bgra8Unorm,
    }
}

pub(crate) fn depth_texture_format(format: DepthStencilFormat) -> Option<wgpu::TextureFormat> {
    match format {
        DepthStencilFormat::None => None,
        DepthStencilFormat::D16 => Some(wgpu::TextureFormat::Depth16Unorm),
        DepthStencilFormat::D24X8 => Some(wgpu::TextureFormat::Depth24Plus),
        DepthStencilFormat::D32 => Some(wgpu::TextureFormat::Depth32Float),
        DepthStencilFormat::D15S1 | DepthStencilFormat::D24S8 | DepthStencilFormat::D24X4S4 => {
            Some(wgpu::TextureFormat::Depth24PlusStencil8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(formats: Vec<wgpu::TextureFormat>, modes: Vec<wgpu::PresentMode>) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats,
            present_modes: modes,
            alpha_modes: vec![wgpu::CompositeAlphaMode::Opaque],
            usages: wgpu::TextureUsages::RENDER_ATTACHMENT,
        }
    }

    #[test]
    fn format_preference_follows_srgb_flag() {
        let c = caps(
            vec![
                wgpu::TextureFormat::Rgba16Float,
                wgpu::TextureFormat::Bgra8UnormSrgb,
                wgpu::TextureFormat::Bgra8Unorm,
            ],
            vec![wgpu::PresentMode::Fifo],
        );
        assert_eq!(choose_surface_format(&c, true), Some(wgpu::TextureFormat::Bgra8UnormSrgb));
        assert_eq!(choose_surface_format(&c, false), Some(wgpu::TextureFormat::Bgra8Unorm));
        assert_eq!(choose_surface_format(&caps(vec![], vec![]), false), None);
    }

    #[test]
    fn immediate_interval_falls_back_without_support() {
        let fifo_only = caps(vec![], vec![wgpu::PresentMode::Fifo]);
        assert_eq!(
            choose_present_mode(&fifo_only, VsyncInterval::Immediate),
            wgpu::PresentMode::AutoNoVsync
        );
        assert_eq!(choose_present_mode(&fifo_only, VsyncInterval::Two), wgpu::PresentMode::Fifo);
    }

    #[test]
    fn stencil_formats_share_the_packed_texture() {
        for f in [DepthStencilFormat::D15S1, DepthStencilFormat::D24S8, DepthStencilFormat::D24X4S4] {
            assert_eq!(depth_texture_format(f), Some(wgpu::TextureFormat::Depth24PlusStencil8));
        }
        assert_eq!(depth_texture_format(DepthStencilFormat::None), None);
        assert_eq!(map_surface_error(&wgpu::SurfaceError::Outdated), SurfaceErrorAction::Reconfigure);
    }
}
