//! Render targets and immediate-mode primitive batching.
//!
//! Convention:
//! - primitive input is in integer surface pixels (top-left origin, +Y down)
//! - points and lines sit on pixel centers, filled quads on pixel edges
//! - the backend converts to NDC using the bound viewport

pub mod batch;
pub mod pattern;
pub mod raster;
mod state;
pub mod surface;
mod vertex;

pub use batch::{Batcher, VertexBatch, DEFAULT_BATCH_CAPACITY};
pub use pattern::{PatternImage, SharedPattern};
pub use state::{
    BatchState, BlendMode, ClearFlags, CompareFunc, RenderStateBlock, StencilOp, StencilState,
    WrapMode,
};
pub use surface::{RenderSurface, SharedSurface, TargetKind, MAX_PEN_WIDTH};
pub use vertex::{PrimitiveStyle, Vertex};
