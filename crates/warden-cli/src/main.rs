//! Warden - directory-backed access gate
//!
//! Checks a username and password against LDAP / Active Directory, applies
//! the allow list, and can remember credentials in an encrypted local file.

mod commands;
mod utils;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use commands::CommandContext;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use warden_auth::audit::AUDIT_TARGET;
use warden_core::config::LoggingConfig;
use warden_core::WardenConfig;

#[derive(Parser)]
#[command(name = "warden")]
#[command(author = "Warden Team")]
#[command(version = warden_core::VERSION)]
#[command(about = "Directory-backed access gate", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "WARDEN_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate against the directory
    Login {
        /// Username; defaults to the remembered one
        #[arg(short, long)]
        user: Option<String>,

        /// Remember the credentials after a successful login
        #[arg(short, long)]
        remember: bool,
    },

    /// Manage remembered credentials
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Check that the directory is reachable with the service account
    Check,

    /// Print a fresh encryption key
    Keygen,
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Show the remembered username
    Show,
    /// Forget remembered credentials
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = WardenConfig::load(cli.config.as_deref())
        .with_context(|| match &cli.config {
            Some(path) => format!("Failed to load configuration from {}", path.display()),
            None => "Failed to load configuration".to_string(),
        })?;

    init_logging(&config.logging, cli.log_level.as_deref());
    debug!("Configuration loaded");

    let ctx = CommandContext {
        output_format: cli.output,
        quiet: cli.quiet,
    };

    let result = match cli.command {
        Commands::Keygen => commands::keygen::execute(&ctx),
        Commands::Login { user, remember } => {
            let gatekeeper = commands::gatekeeper(&config)?;
            return commands::login::execute(&ctx, &gatekeeper, user, remember).await;
        }
        Commands::Cache { action } => {
            let gatekeeper = commands::gatekeeper(&config)?;
            commands::cache::execute(&ctx, &gatekeeper, action).await
        }
        Commands::Check => {
            let gatekeeper = commands::gatekeeper(&config)?;
            commands::check::execute(&ctx, &gatekeeper).await
        }
    };

    result.map(|()| ExitCode::SUCCESS)
}

/// Filter used when `RUST_LOG` is unset. Audit events stay off the user's
/// terminal unless a level is asked for explicitly.
fn default_directives(logging: &LoggingConfig, cli_level: Option<&str>) -> String {
    match cli_level {
        Some(level) => level.to_string(),
        None => format!("{},{}=warn", logging.level, AUDIT_TARGET),
    }
}

/// Log to stderr so command output on stdout stays clean
fn init_logging(logging: &LoggingConfig, cli_level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(logging, cli_level)));

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
