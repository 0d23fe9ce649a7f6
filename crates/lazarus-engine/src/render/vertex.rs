use bytemuck::{Pod, Zeroable};

use crate::coords::Color;

/// Batched vertex: surface-pixel position with fixed Z, color, pattern texcoord.
///
/// Layout (36 bytes):
///
///  offset  0  position [f32; 3]   loc 0
///  offset 12  color    [f32; 4]   loc 1
///  offset 28  uv       [f32; 2]   loc 2
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

impl Vertex {
    #[inline]
    pub fn new(x: f32, y: f32, z: f32, color: Color, uv: [f32; 2]) -> Self {
        Self {
            position: [x, y, z],
            color: color.to_array(),
            uv,
        }
    }
}

/// Topology of a batched run.
///
/// Only list topologies exist: consecutive primitives of the same style can be
/// concatenated without joining them.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PrimitiveStyle {
    PointList,
    LineList,
    TriangleList,
}

impl PrimitiveStyle {
    pub const fn vertices_per_primitive(self) -> usize {
        match self {
            PrimitiveStyle::PointList => 1,
            PrimitiveStyle::LineList => 2,
            PrimitiveStyle::TriangleList => 3,
        }
    }
}
