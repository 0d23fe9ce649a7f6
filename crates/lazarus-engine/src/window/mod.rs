//! Window + runtime loop.
//!
//! Owns the `winit` event loop and window, and feeds window geometry and
//! focus into the device state machine.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
