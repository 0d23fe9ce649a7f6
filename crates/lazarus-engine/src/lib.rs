//! Lazarus engine crate.
//!
//! A 2D immediate-mode rendering core: graphics device lifecycle (mode
//! changes, loss and reset), render target surfaces, and batched primitive
//! drawing, with a wgpu backend and a winit runtime on top.

pub mod coords;
pub mod core;
pub mod device;
pub mod logging;
pub mod render;
pub mod window;
