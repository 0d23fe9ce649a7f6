//! Integer rasterization helpers.
//!
//! Incremental midpoint/Bresenham stepping; no trigonometry. Every function
//! takes the clip rectangle of the target surface and only returns pixels
//! inside it. Outlines are returned as deduplicated pixel lists, filled shapes
//! as horizontal spans (one per row, top to bottom).
//!
//! Coordinates are widened to `i64` internally, so any `i32` input is valid.

use crate::coords::{Point, Rect};

/// Largest radius walked with midpoint stepping. Bigger shapes are sampled
/// row by row (and column by column) inside the clip rectangle instead, so
/// the work stays bounded by the surface size.
pub const MAX_STEPPED_RADIUS: i32 = 1 << 16;

/// Inclusive horizontal run of pixels on row `y`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Span {
    pub y: i32,
    pub x0: i32,
    pub x1: i32,
}

impl Span {
    pub fn len(&self) -> u32 {
        (i64::from(self.x1) - i64::from(self.x0) + 1).max(0) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.x1 < self.x0
    }
}

/// Clip rectangle with inclusive pixel bounds.
#[derive(Debug, Copy, Clone)]
struct Clip {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

impl Clip {
    fn new(rect: Rect) -> Option<Self> {
        let r = rect.normalized();
        if r.is_empty() {
            return None;
        }
        let (x, y) = (i64::from(r.x), i64::from(r.y));
        Some(Self {
            x0: x,
            y0: y,
            x1: x + i64::from(r.width) - 1,
            y1: y + i64::from(r.height) - 1,
        })
    }

    fn point(&self, x: i64, y: i64) -> Option<Point> {
        (x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1)
            .then(|| Point::new(x as i32, y as i32))
    }

    fn span(&self, y: i64, x0: i64, x1: i64) -> Option<Span> {
        if y < self.y0 || y > self.y1 {
            return None;
        }
        let (x0, x1) = (x0.max(self.x0), x1.min(self.x1));
        (x0 <= x1).then(|| Span {
            y: y as i32,
            x0: x0 as i32,
            x1: x1 as i32,
        })
    }

    /// True when the box `center ± (rx, ry)` overlaps the clip area.
    fn touches(&self, cx: i64, cy: i64, rx: i64, ry: i64) -> bool {
        cx + rx >= self.x0 && cx - rx <= self.x1 && cy + ry >= self.y0 && cy - ry <= self.y1
    }

    /// Cuts the segment `a`-`b` to the clip area (Liang-Barsky).
    fn segment(&self, a: (i64, i64), b: (i64, i64)) -> Option<((i64, i64), (i64, i64))> {
        let (x0, y0) = (a.0 as f64, a.1 as f64);
        let (dx, dy) = ((b.0 - a.0) as f64, (b.1 - a.1) as f64);
        let (mut t0, mut t1) = (0.0f64, 1.0f64);

        let edges = [
            (-dx, x0 - self.x0 as f64),
            (dx, self.x1 as f64 - x0),
            (-dy, y0 - self.y0 as f64),
            (dy, self.y1 as f64 - y0),
        ];
        for (p, q) in edges {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }

        let at = |t: f64| {
            (
                ((x0 + t * dx).round() as i64).clamp(self.x0, self.x1),
                ((y0 + t * dy).round() as i64).clamp(self.y0, self.y1),
            )
        };
        Some((at(t0), at(t1)))
    }
}

/// Pixels of a line from `p0` to `p1`, both endpoints included, limited to `clip`.
///
/// The segment is cut to the clip rectangle before stepping.
pub fn line_points(p0: Point, p1: Point, clip: Rect) -> Vec<Point> {
    let Some(clip) = Clip::new(clip) else {
        return Vec::new();
    };
    let a = (i64::from(p0.x), i64::from(p0.y));
    let b = (i64::from(p1.x), i64::from(p1.y));
    let Some(((x0, y0), (x1, y1))) = clip.segment(a, b) else {
        return Vec::new();
    };

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };

    let mut out = Vec::with_capacity(dx.max(-dy) as usize + 1);
    let (mut x, mut y) = (x0, y0);
    let mut err = dx + dy;

    loop {
        out.extend(clip.point(x, y));
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    out
}

/// Steps one octant of a circle of radius `r` (x <= y), calling `plot(x, y)`.
fn circle_octant(r: i64, mut plot: impl FnMut(i64, i64)) {
    let (mut x, mut y) = (0, r);
    let mut d = 1 - r;
    while x <= y {
        plot(x, y);
        x += 1;
        if d < 0 {
            d += 2 * x + 1;
        } else {
            y -= 1;
            d += 2 * (x - y) + 1;
        }
    }
}

/// Steps one quadrant of an ellipse (x, y >= 0), calling `plot(x, y)`.
///
/// Decision variables are kept at 4x scale so they stay integral.
fn ellipse_quadrant(rx: i64, ry: i64, mut plot: impl FnMut(i64, i64)) {
    let a2 = rx * rx;
    let b2 = ry * ry;

    let (mut x, mut y) = (0i64, ry);
    let mut px = 0i64;
    let mut py = 2 * a2 * y;

    // Region 1: slope above -1, x advances every step.
    let mut p = 4 * b2 - 4 * a2 * y + a2;
    plot(x, y);
    while px < py {
        x += 1;
        px += 2 * b2;
        if p < 0 {
            p += 4 * (b2 + px);
        } else {
            y -= 1;
            py -= 2 * a2;
            p += 4 * (b2 + px - py);
        }
        plot(x, y);
    }

    // Region 2: y advances every step.
    p = b2 * (2 * x + 1) * (2 * x + 1) + 4 * a2 * (y - 1) * (y - 1) - 4 * a2 * b2;
    while y > 0 {
        y -= 1;
        py -= 2 * a2;
        if p > 0 {
            p += 4 * (a2 - py);
        } else {
            x += 1;
            px += 2 * b2;
            p += 4 * (a2 - py + px);
        }
        plot(x, y);
    }

    // Flat ellipses reach row 0 before x reaches the radius.
    while x < rx {
        x += 1;
        plot(x, 0);
    }
}

/// Half width of an ellipse on the row `dy` away from its center.
fn half_width(rx: i64, ry: i64, dy: i64) -> i64 {
    if ry == 0 {
        return rx;
    }
    let t = dy as f64 / ry as f64;
    (rx as f64 * (1.0 - t * t).max(0.0).sqrt()).round() as i64
}

fn is_stepped(rx: i64, ry: i64) -> bool {
    rx.max(ry) <= i64::from(MAX_STEPPED_RADIUS)
}

fn dedup(mut points: Vec<Point>) -> Vec<Point> {
    points.sort_unstable_by_key(|p| (p.y, p.x));
    points.dedup();
    points
}

/// Outline of a shape too large to step, sampled over the clip area only.
fn sampled_outline(cx: i64, cy: i64, rx: i64, ry: i64, clip: &Clip) -> Vec<Point> {
    let mut out = Vec::new();
    for y in clip.y0.max(cy - ry)..=clip.y1.min(cy + ry) {
        let w = half_width(rx, ry, y - cy);
        out.extend(clip.point(cx - w, y));
        out.extend(clip.point(cx + w, y));
    }
    if rx > 0 {
        for x in clip.x0.max(cx - rx)..=clip.x1.min(cx + rx) {
            let h = half_width(ry, rx, x - cx);
            out.extend(clip.point(x, cy - h));
            out.extend(clip.point(x, cy + h));
        }
    }
    dedup(out)
}

/// Outline pixels of a circle. Negative radius yields nothing, zero the center.
pub fn circle_points(center: Point, radius: i32, clip: Rect) -> Vec<Point> {
    ellipse_points(center, radius, radius, clip)
}

/// Outline pixels of an axis-aligned ellipse with radii `rx`, `ry`.
pub fn ellipse_points(center: Point, rx: i32, ry: i32, clip: Rect) -> Vec<Point> {
    let Some(clip) = Clip::new(clip) else {
        return Vec::new();
    };
    let (cx, cy) = (i64::from(center.x), i64::from(center.y));
    let (rx, ry) = (i64::from(rx), i64::from(ry));
    if rx < 0 || ry < 0 || !clip.touches(cx, cy, rx, ry) {
        return Vec::new();
    }
    if ry == 0 {
        return clip.span(cy, cx - rx, cx + rx).map_or_else(Vec::new, |s| {
            (s.x0..=s.x1).map(|x| Point::new(x, s.y)).collect()
        });
    }
    if !is_stepped(rx, ry) {
        return sampled_outline(cx, cy, rx, ry, &clip);
    }

    let mut out = Vec::new();
    let mut plot4 = |x: i64, y: i64| {
        out.extend(clip.point(cx + x, cy + y));
        out.extend(clip.point(cx - x, cy + y));
        out.extend(clip.point(cx + x, cy - y));
        out.extend(clip.point(cx - x, cy - y));
    };
    if rx == ry {
        circle_octant(rx, |x, y| {
            plot4(x, y);
            plot4(y, x);
        });
    } else {
        ellipse_quadrant(rx, ry, plot4);
    }
    dedup(out)
}

/// Rows of a filled circle.
pub fn circle_spans(center: Point, radius: i32, clip: Rect) -> Vec<Span> {
    ellipse_spans(center, radius, radius, clip)
}

/// Rows of a filled axis-aligned ellipse.
pub fn ellipse_spans(center: Point, rx: i32, ry: i32, clip: Rect) -> Vec<Span> {
    let Some(clip) = Clip::new(clip) else {
        return Vec::new();
    };
    let (cx, cy) = (i64::from(center.x), i64::from(center.y));
    let (rx, ry) = (i64::from(rx), i64::from(ry));
    if rx < 0 || ry < 0 || !clip.touches(cx, cy, rx, ry) {
        return Vec::new();
    }

    if !is_stepped(rx, ry) {
        return (clip.y0.max(cy - ry)..=clip.y1.min(cy + ry))
            .filter_map(|y| {
                let w = half_width(rx, ry, y - cy);
                clip.span(y, cx - w, cx + w)
            })
            .collect();
    }

    // Half width per row; index 0 is row `-ry`.
    let mut half = vec![None::<i64>; 2 * ry as usize + 1];
    let mut widen = |row: i64, w: i64| {
        let slot = &mut half[(row + ry) as usize];
        *slot = Some(slot.map_or(w, |cur| cur.max(w)));
    };
    if ry == 0 {
        widen(0, rx);
    } else if rx == ry {
        circle_octant(rx, |x, y| {
            for (row, w) in [(y, x), (-y, x), (x, y), (-x, y)] {
                widen(row, w);
            }
        });
    } else {
        ellipse_quadrant(rx, ry, |x, y| {
            widen(y, x);
            widen(-y, x);
        });
    }

    half.iter()
        .enumerate()
        .filter_map(|(i, w)| {
            let w = (*w)?;
            clip.span(cy - ry + i as i64, cx - w, cx + w)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> Point {
        Point::new(x, y)
    }

    /// Clip area large enough for every shape in these tests.
    fn wide() -> Rect {
        Rect::new(-1000, -1000, 2000, 2000)
    }

    #[test]
    fn line_includes_both_endpoints_and_is_connected() {
        let pts = line_points(p(0, 0), p(7, 3), wide());
        assert_eq!(pts.first(), Some(&p(0, 0)));
        assert_eq!(pts.last(), Some(&p(7, 3)));
        assert_eq!(pts.len(), 8);
        for w in pts.windows(2) {
            assert!((w[1].x - w[0].x).abs() <= 1 && (w[1].y - w[0].y).abs() <= 1);
        }
    }

    #[test]
    fn degenerate_line_is_one_pixel() {
        assert_eq!(line_points(p(4, 4), p(4, 4), wide()), vec![p(4, 4)]);
        assert!(line_points(p(4, 4), p(4, 4), Rect::new(0, 0, 4, 4)).is_empty());
    }

    #[test]
    fn extreme_line_is_cut_to_the_clip_area() {
        let clip = Rect::new(0, 0, 100, 50);
        let pts = line_points(p(-2_000_000_000, 0), p(2_000_000_000, 1), clip);
        assert_eq!(pts.len(), 100);
        assert!(pts.iter().all(|q| clip.contains(*q)));
        assert_eq!(pts.first().map(|q| q.x), Some(0));
        assert_eq!(pts.last().map(|q| q.x), Some(99));

        let corner = line_points(p(i32::MIN, i32::MIN), p(i32::MAX, i32::MAX), clip);
        assert!(!corner.is_empty());
        assert!(corner.iter().all(|q| clip.contains(*q)));

        assert!(line_points(p(i32::MIN, -5), p(i32::MAX, -5), clip).is_empty());
    }

    #[test]
    fn circle_radius_edge_cases() {
        assert!(circle_points(p(0, 0), -1, wide()).is_empty());
        assert_eq!(circle_points(p(5, 5), 0, wide()), vec![p(5, 5)]);
        assert!(circle_spans(p(0, 0), -3, wide()).is_empty());
        assert_eq!(circle_spans(p(2, 2), 0, wide()), vec![Span { y: 2, x0: 2, x1: 2 }]);
    }

    #[test]
    fn circle_outline_is_symmetric_and_on_radius() {
        let r = 10;
        let pts = circle_points(p(0, 0), r, wide());
        for q in &pts {
            assert!(pts.contains(&p(-q.x, q.y)));
            assert!(pts.contains(&p(q.y, q.x)));
            let d2 = q.x * q.x + q.y * q.y;
            assert!((d2 - r * r).abs() <= 2 * r, "{q:?} off the circle");
        }
        assert!(pts.contains(&p(10, 0)));
        assert!(pts.contains(&p(0, -10)));
    }

    #[test]
    fn filled_circle_has_one_span_per_row() {
        let spans = circle_spans(p(0, 0), 4, wide());
        assert_eq!(spans.len(), 9);
        assert_eq!(spans[0], Span { y: -4, x0: spans[0].x0, x1: -spans[0].x0 });
        assert_eq!(spans[4], Span { y: 0, x0: -4, x1: 4 });
        assert!(spans.windows(2).all(|w| w[1].y == w[0].y + 1));
    }

    #[test]
    fn shapes_are_clipped_to_the_surface() {
        let clip = Rect::new(0, 0, 10, 10);
        let pts = circle_points(p(0, 0), 5, clip);
        assert!(!pts.is_empty());
        assert!(pts.iter().all(|q| clip.contains(*q)));

        let spans = circle_spans(p(0, 0), 5, clip);
        assert_eq!(spans.len(), 6);
        assert!(spans.iter().all(|s| s.x0 == 0 && s.y >= 0));

        assert!(circle_points(p(100, 100), 5, clip).is_empty());
        assert!(ellipse_spans(p(-100, 0), 20, 3, clip).is_empty());
    }

    #[test]
    fn huge_radius_work_is_bounded_by_the_clip_area() {
        let clip = Rect::new(0, 0, 64, 32);

        // Fully covering fill: every clip row, edge to edge.
        let spans = circle_spans(p(32, 16), i32::MAX, clip);
        assert_eq!(spans.len(), 32);
        assert!(spans.iter().all(|s| s.x0 == 0 && s.x1 == 63));

        // Outline far outside the clip area in every direction.
        assert!(circle_points(p(32, 16), i32::MAX, clip).is_empty());

        // An edge crossing the clip area is still drawn.
        let r = 1_000_000;
        let pts = circle_points(p(10, 16 - r), r, clip);
        assert!(pts.contains(&p(10, 16)));
        assert!(pts.iter().all(|q| clip.contains(*q)));

        let far = ellipse_points(p(i32::MIN, i32::MAX), i32::MAX, i32::MAX, clip);
        assert!(far.iter().all(|q| clip.contains(*q)));
    }

    #[test]
    fn ellipse_extremes_and_degenerate_axes() {
        let pts = ellipse_points(p(0, 0), 8, 3, wide());
        assert!(pts.contains(&p(8, 0)) && pts.contains(&p(-8, 0)));
        assert!(pts.contains(&p(0, 3)) && pts.contains(&p(0, -3)));

        assert_eq!(ellipse_points(p(1, 1), 0, 0, wide()), vec![p(1, 1)]);
        assert_eq!(ellipse_points(p(0, 0), 2, 0, wide()).len(), 5);
        assert_eq!(ellipse_points(p(0, 0), 0, 2, wide()).len(), 5);
        assert!(ellipse_points(p(0, 0), -1, 4, wide()).is_empty());
    }

    #[test]
    fn flat_ellipse_reaches_its_horizontal_radius() {
        let pts = ellipse_points(p(0, 0), 8, 1, wide());
        assert!(pts.contains(&p(8, 0)) && pts.contains(&p(-8, 0)));
        assert!(pts.contains(&p(0, 1)) && pts.contains(&p(0, -1)));
        assert!(pts.iter().all(|q| q.y.abs() <= 1 && q.x.abs() <= 8));

        let spans = ellipse_spans(p(0, 0), 8, 1, wide());
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[1], Span { y: 0, x0: -8, x1: 8 });

        for (rx, ry) in [(40, 2), (100, 3), (25, 1)] {
            let pts = ellipse_points(p(0, 0), rx, ry, wide());
            assert!(pts.contains(&p(rx, 0)), "{rx}x{ry} misses (rx, 0)");
            assert!(pts.contains(&p(0, ry)), "{rx}x{ry} misses (0, ry)");
            let row0 = ellipse_spans(p(0, 0), rx, ry, wide())
                .into_iter()
                .find(|s| s.y == 0);
            assert_eq!(row0, Some(Span { y: 0, x0: -rx, x1: rx }));
        }
    }

    #[test]
    fn filled_ellipse_rows_span_the_vertical_radius() {
        let spans = ellipse_spans(p(10, 10), 6, 2, wide());
        assert_eq!(spans.len(), 5);
        assert_eq!(spans[2], Span { y: 10, x0: 4, x1: 16 });
        assert_eq!(ellipse_spans(p(0, 0), 3, 0, wide()), vec![Span { y: 0, x0: -3, x1: 3 }]);
    }
}
