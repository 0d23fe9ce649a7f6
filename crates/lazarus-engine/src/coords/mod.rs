//! Coordinate and color types shared by render targets and the batcher.
//!
//! Canonical surface space:
//! - integer pixels for primitive input (points, rects, radii)
//! - origin top-left, +X right, +Y down
//!
//! Vertices carry `f32` positions; the backend converts them to NDC using the
//! bound viewport.

mod color;
mod point;
mod rect;
mod viewport;

pub use color::Color;
pub use point::Point;
pub use rect::Rect;
pub use viewport::Viewport;
