//! Fixed-function render state as an explicit value object.
//!
//! Devices forget all of this across a reset, so the context keeps a
//! `RenderStateBlock` snapshot and reapplies it imperatively afterwards.

use bitflags::bitflags;

use crate::device::GpuHandle;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendMode {
    /// Source replaces destination.
    Opaque,
    /// `src * a + dst * (1 - a)`.
    Alpha,
    /// `src * a + dst`.
    Additive,
    /// `src * dst`.
    Multiply,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CompareFunc {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    IncrementClamp,
    DecrementClamp,
    Invert,
    IncrementWrap,
    DecrementWrap,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct StencilState {
    pub enabled: bool,
    pub func: CompareFunc,
    pub reference: u32,
    pub read_mask: u32,
    pub write_mask: u32,
    pub fail_op: StencilOp,
    pub depth_fail_op: StencilOp,
    pub pass_op: StencilOp,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            enabled: false,
            func: CompareFunc::Always,
            reference: 0,
            read_mask: 0xFF,
            write_mask: 0xFF,
            fail_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
            pass_op: StencilOp::Keep,
        }
    }
}

/// Texture addressing used when sampling a drawing pattern.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum WrapMode {
    Clamp,
    Repeat,
    Mirror,
}

/// Per-target render state: blend, depth/stencil tests, pattern addressing.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RenderStateBlock {
    pub blend: BlendMode,
    /// `Always` disables the depth test.
    pub depth_func: CompareFunc,
    pub depth_write: bool,
    pub stencil: StencilState,
    pub wrap: WrapMode,
}

impl Default for RenderStateBlock {
    /// 2D defaults: alpha blending, no depth test or write, stencil off, tiled patterns.
    fn default() -> Self {
        Self {
            blend: BlendMode::Alpha,
            depth_func: CompareFunc::Always,
            depth_write: false,
            stencil: StencilState::default(),
            wrap: WrapMode::Repeat,
        }
    }
}

/// Everything that must match for two primitives to share one draw call.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BatchState {
    pub render: RenderStateBlock,
    /// Texture of the active drawing pattern, if any.
    pub pattern: Option<GpuHandle>,
}

impl BatchState {
    pub const fn new(render: RenderStateBlock, pattern: Option<GpuHandle>) -> Self {
        Self { render, pattern }
    }
}

bitflags! {
    /// Buffers touched by a clear.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct ClearFlags: u8 {
        const TARGET = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

impl Default for ClearFlags {
    fn default() -> Self {
        ClearFlags::all()
    }
}
