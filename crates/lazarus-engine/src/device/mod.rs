//! Graphics device lifecycle.
//!
//! This module is responsible for:
//! - computing presentation parameters from a requested video mode
//! - creating the device, detecting loss, and resetting it
//! - notifying every registered GPU resource around a reset
//! - the `GpuBackend` seam plus its wgpu and recording implementations

mod adapter;
mod backend;
mod context;
mod error;
mod frame;
mod gpu;
mod init;
mod lifecycle;
mod mode;
mod pipeline;
mod present;
pub mod recording;
mod registry;
mod surface;

pub use adapter::{AdapterCaps, StaticCaps};
pub use backend::{
    BufferInfo, DeviceStatus, GpuBackend, GpuHandle, RenderBufferDesc, RenderBufferKind,
    ResetOutcome, WindowKey,
};
pub use context::{DeviceConfig, DeviceContext, ModeSettings, TargetBinding};
pub use error::{DeviceError, ResultCode, ResultKind};
pub use gpu::WgpuBackend;
pub use init::BackendConfig;
pub use lifecycle::DeviceState;
pub use mode::{DepthStencilFormat, PixelFormat, VideoMode, VsyncInterval};
pub use present::{
    build as build_presentation_parameters, select_depth_stencil_format, PresentRequest,
    PresentationParameters, SwapEffect, WindowKind, DISCARD_BACK_BUFFER_COUNT,
    MIN_BACK_BUFFER_DIM,
};
pub use registry::{DeviceRegistry, DeviceResource, Registration, ResourceId};
