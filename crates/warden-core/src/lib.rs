//! Warden Core Library
//!
//! Configuration and shared error types for the Warden access gate.

pub mod config;
pub mod error;

pub use config::WardenConfig;
pub use error::{ConfigError, Result};

/// Warden version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prefix for all environment variables read by [`WardenConfig::from_env`]
pub const ENV_PREFIX: &str = "WARDEN_";

/// Default directory operation timeout (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
