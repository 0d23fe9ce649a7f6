/// Pixel viewport of a render target plus its depth range.
///
/// Every surface exposes one as its `default_view`, covering the whole target.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    /// Viewport covering a whole `width` x `height` target.
    #[inline]
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0 && self.min_depth <= self.max_depth
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::full(0, 0)
    }
}
