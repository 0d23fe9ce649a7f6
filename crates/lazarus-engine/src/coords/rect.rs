use super::Point;

/// Axis-aligned pixel rectangle (top-left origin, half-open extents).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    #[inline]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle covering a whole `width` x `height` surface.
    #[inline]
    pub fn of_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, clamp_dim(width), clamp_dim(height))
    }

    #[inline]
    pub fn origin(self) -> Point {
        Point::new(self.x, self.y)
    }

    /// One past the bottom-right pixel, saturated to the `i32` range.
    #[inline]
    pub fn end(self) -> Point {
        Point::new(
            saturate(i64::from(self.x) + i64::from(self.width)),
            saturate(i64::from(self.y) + i64::from(self.height)),
        )
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Flips negative extents so width/height are non-negative.
    #[inline]
    pub fn normalized(self) -> Self {
        let (x, width) = flip(self.x, self.width);
        let (y, height) = flip(self.y, self.height);
        Self { x, y, width, height }
    }

    #[inline]
    pub fn contains(self, p: Point) -> bool {
        let r = self.normalized();
        let (px, py) = (i64::from(p.x), i64::from(p.y));
        px >= i64::from(r.x)
            && py >= i64::from(r.y)
            && px < i64::from(r.x) + i64::from(r.width)
            && py < i64::from(r.y) + i64::from(r.height)
    }

    /// Grows the rectangle by `by` pixels on every side, saturating.
    #[inline]
    pub fn outset(self, by: i32) -> Self {
        let r = self.normalized();
        let by = i64::from(by);
        Self::new(
            saturate(i64::from(r.x) - by),
            saturate(i64::from(r.y) - by),
            saturate(i64::from(r.width) + 2 * by),
            saturate(i64::from(r.height) + 2 * by),
        )
    }

    #[inline]
    pub fn intersect(self, other: Rect) -> Option<Rect> {
        let a = self.normalized();
        let b = other.normalized();

        let x0 = a.x.max(b.x);
        let y0 = a.y.max(b.y);
        let x1 = (i64::from(a.x) + i64::from(a.width)).min(i64::from(b.x) + i64::from(b.width));
        let y1 = (i64::from(a.y) + i64::from(a.height)).min(i64::from(b.y) + i64::from(b.height));

        if x1 <= i64::from(x0) || y1 <= i64::from(y0) {
            None
        } else {
            Some(Rect::new(
                x0,
                y0,
                saturate(x1 - i64::from(x0)),
                saturate(y1 - i64::from(y0)),
            ))
        }
    }
}

/// Moves the origin to the low end of a negative extent.
fn flip(origin: i32, extent: i32) -> (i32, i32) {
    if extent >= 0 {
        return (origin, extent);
    }
    let start = i64::from(origin) + i64::from(extent);
    (saturate(start), saturate(-i64::from(extent)))
}

fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn clamp_dim(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: i32, y: i32, w: i32, h: i32) -> Rect {
        Rect::new(x, y, w, h)
    }

    #[test]
    fn normalized_flips_negative_extents() {
        assert_eq!(r(10, 10, -4, -3).normalized(), r(6, 7, 4, 3));
        assert_eq!(r(1, 2, 3, 4).normalized(), r(1, 2, 3, 4));
    }

    #[test]
    fn contains_is_half_open() {
        let rect = r(0, 0, 10, 10);
        assert!(rect.contains(Point::new(0, 0)));
        assert!(rect.contains(Point::new(9, 9)));
        assert!(!rect.contains(Point::new(10, 10)));
        assert!(!rect.contains(Point::new(-1, 5)));
    }

    #[test]
    fn intersect_overlapping() {
        assert_eq!(r(0, 0, 10, 10).intersect(r(5, 5, 10, 10)), Some(r(5, 5, 5, 5)));
    }

    #[test]
    fn intersect_touching_edge_returns_none() {
        assert!(r(0, 0, 10, 10).intersect(r(10, 0, 10, 10)).is_none());
    }

    #[test]
    fn extreme_extents_do_not_overflow() {
        let wide = r(i32::MAX - 1, 0, i32::MAX, 10);
        assert_eq!(wide.end(), Point::new(i32::MAX, 10));
        assert!(wide.contains(Point::new(i32::MAX, 5)));
        assert_eq!(
            wide.intersect(r(0, 0, i32::MAX, 20)),
            Some(r(i32::MAX - 1, 0, 1, 10))
        );

        let flipped = r(i32::MIN, 0, i32::MIN, 1).normalized();
        assert_eq!(flipped, r(i32::MIN, 0, i32::MAX, 1));
    }

    #[test]
    fn outset_grows_every_side() {
        assert_eq!(r(0, 0, 10, 4).outset(2), r(-2, -2, 14, 8));
        assert_eq!(r(i32::MIN, 0, 1, 1).outset(5).x, i32::MIN);
    }

    #[test]
    fn of_size_saturates_huge_dimensions() {
        let rect = Rect::of_size(u32::MAX, 4);
        assert_eq!(rect.width, i32::MAX);
        assert_eq!(rect.height, 4);
    }
}
