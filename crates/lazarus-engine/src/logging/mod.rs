//! Logging setup.
//!
//! The engine logs through the `log` facade only; this module installs
//! `env_logger` as the sink for binaries that want one.

mod init;

pub use init::{init_logging, LoggingConfig};
