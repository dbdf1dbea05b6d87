//! cache command - inspect or forget remembered credentials

use super::CommandContext;
use crate::CacheAction;
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use warden_auth::Gatekeeper;

#[derive(Serialize)]
struct CacheShowResult {
    path: String,
    found: bool,
    identifier: Option<String>,
    notice: Option<&'static str>,
}

pub async fn execute(ctx: &CommandContext, gatekeeper: &Gatekeeper, action: CacheAction) -> Result<()> {
    match action {
        CacheAction::Show => show(ctx, gatekeeper).await,
        CacheAction::Clear => clear(ctx, gatekeeper).await,
    }
}

/// Never prints the secret
async fn show(ctx: &CommandContext, gatekeeper: &Gatekeeper) -> Result<()> {
    let prefill = gatekeeper.cache_load().await;
    let path = gatekeeper.cache().path().display().to_string();

    if ctx.is_json() {
        let result = CacheShowResult {
            path,
            found: prefill.found,
            identifier: prefill.found.then(|| prefill.identifier.clone()),
            notice: prefill.notice,
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if let Some(notice) = prefill.notice {
        println!("{}", notice.yellow());
    } else if prefill.found {
        println!("  {}: {}", "Username".cyan(), prefill.identifier);
    } else {
        println!("No saved credentials");
    }
    println!("  {}: {}", "File".cyan(), path.dimmed());

    Ok(())
}

async fn clear(ctx: &CommandContext, gatekeeper: &Gatekeeper) -> Result<()> {
    let removed = gatekeeper.cache_clear().await?;

    if ctx.is_json() {
        println!("{}", serde_json::json!({ "removed": removed }));
    } else if removed {
        ctx.info(&format!("{} Saved credentials removed", "✓".green()));
    } else {
        ctx.info("No saved credentials");
    }

    Ok(())
}
