//! check command - verify the directory with the service account

use super::CommandContext;
use anyhow::{Context, Result};
use colored::Colorize;
use warden_auth::Gatekeeper;

pub async fn execute(ctx: &CommandContext, gatekeeper: &Gatekeeper) -> Result<()> {
    let info = gatekeeper
        .check_directory()
        .await
        .context("Directory check failed")?;

    if ctx.is_json() {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{} Directory reachable", "✓".green());
    println!();
    println!(
        "  {}: {}",
        "Vendor".cyan(),
        info.vendor.as_deref().unwrap_or("(not reported)")
    );
    if let Some(version) = &info.version {
        println!("  {}: {}", "Version".cyan(), version);
    }
    println!(
        "  {}: {}",
        "LDAP versions".cyan(),
        info.supported_ldap_version.join(", ")
    );
    if let Some(default) = &info.default_naming_context {
        println!("  {}: {}", "Default context".cyan(), default);
    }
    for context in &info.naming_contexts {
        println!("  {}: {}", "Naming context".cyan(), context);
    }

    Ok(())
}
