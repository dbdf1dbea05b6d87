//! keygen command - print a fresh vault key

use super::CommandContext;
use anyhow::Result;
use serde_json::json;
use warden_crypto::generate_key;

pub fn execute(ctx: &CommandContext) -> Result<()> {
    let key = generate_key();

    if ctx.is_json() {
        println!("{}", json!({ "key": key }));
    } else {
        println!("{}", key);
    }

    Ok(())
}
