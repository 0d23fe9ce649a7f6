/// Initialization parameters for the wgpu backend.
///
/// Presentation settings that change at runtime (size, vsync, fullscreen,
/// depth format) come from `PresentationParameters` instead.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Backends the instance may pick an adapter from.
    pub backends: wgpu::Backends,

    pub power_preference: wgpu::PowerPreference,

    /// Prefer an sRGB surface format when available.
    ///
    /// Off by default: vertex colors are written to the back buffer as-is.
    pub prefer_srgb: bool,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub required_features: wgpu::Features,

    pub required_limits: wgpu::Limits,

    /// Upper bound on the swap chain depth; the back-buffer count of the
    /// presentation parameters is clamped to it.
    pub desired_maximum_frame_latency: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            prefer_srgb: false,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}
