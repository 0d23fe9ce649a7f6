/// Back-buffer / display pixel format.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PixelFormat {
    /// 32-bit with unused alpha.
    X8R8G8B8,
    /// 32-bit with alpha.
    A8R8G8B8,
    /// 16-bit 5-6-5.
    R5G6B5,
    /// 16-bit with unused top bit.
    X1R5G5B5,
}

impl PixelFormat {
    pub const fn bits_per_pixel(self) -> u32 {
        match self {
            PixelFormat::X8R8G8B8 | PixelFormat::A8R8G8B8 => 32,
            PixelFormat::R5G6B5 | PixelFormat::X1R5G5B5 => 16,
        }
    }
}

/// Requested display mode. Compared by value to decide whether a reset is required.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VideoMode {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u32,
    /// Hz; 0 means "adapter default".
    pub refresh_rate: u32,
    pub format: PixelFormat,
}

impl VideoMode {
    pub const fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            bit_depth: format.bits_per_pixel(),
            refresh_rate: 0,
            format,
        }
    }

    pub const fn with_refresh_rate(mut self, hz: u32) -> Self {
        self.refresh_rate = hz;
        self
    }
}

impl Default for VideoMode {
    fn default() -> Self {
        Self::new(640, 480, PixelFormat::X8R8G8B8)
    }
}

/// Presentation (vertical sync) interval.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VsyncInterval {
    /// Present immediately, never wait for vertical blank.
    Immediate,
    One,
    Two,
    Three,
    Four,
}

/// Depth/stencil buffer format. `None` means no automatic depth buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DepthStencilFormat {
    None,
    D16,
    D15S1,
    D24X8,
    D24S8,
    D24X4S4,
    D32,
}

impl DepthStencilFormat {
    pub const fn has_depth(self) -> bool {
        !matches!(self, DepthStencilFormat::None)
    }

    pub const fn has_stencil(self) -> bool {
        matches!(
            self,
            DepthStencilFormat::D15S1 | DepthStencilFormat::D24S8 | DepthStencilFormat::D24X4S4
        )
    }
}
