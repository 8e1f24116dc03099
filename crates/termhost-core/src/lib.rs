//! termhost-core — configuration and shared constants for the termhost
//! custom-shell framework.
//!
//! Every other termhost crate depends on this one; it must stay free of
//! heavyweight dependencies (no runtime, no I/O beyond config loading).

pub mod config;
pub mod error;

pub use config::{ConsoleConfig, TermhostConfig};
pub use error::{CoreError, Result};
