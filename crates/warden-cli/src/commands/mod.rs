//! CLI command implementations

pub mod cache;
pub mod check;
pub mod keygen;
pub mod login;

use crate::OutputFormat;
use anyhow::{anyhow, Result};
use warden_auth::Gatekeeper;
use warden_core::WardenConfig;

/// Context passed to all commands
pub struct CommandContext {
    pub output_format: OutputFormat,
    pub quiet: bool,
}

impl CommandContext {
    /// Check if output should be JSON
    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }

    /// Print info message if not quiet
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Print a message for the user on stderr
    pub fn notice(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", msg);
        }
    }
}

/// Build the gatekeeper; configuration problems stop the command here.
pub fn gatekeeper(config: &WardenConfig) -> Result<Gatekeeper> {
    Gatekeeper::from_config(config)
        .map_err(|e| anyhow!("Invalid configuration [{}]: {}", e.code(), e))
}
