//! Sushibox - self-extracting, version-pinned command launcher
//!
//! A launcher binary carries a bundle of files. On each run it makes sure
//! the bundle is extracted, intact, under a per-version cache directory,
//! then replaces itself with the requested command from that bundle.

pub mod assets;
pub mod cache;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod launcher;

pub use error::{SushiboxError, SushiboxResult};

/// Version of the embedded bundle, fixed at build time
pub const VERSION: &str = env!("SUSHIBOX_BUILD_VERSION");

/// Environment variable holding a `tracing` filter directive
pub const LOG_ENV: &str = "SUSHIBOX_LOG";
