use anyhow::{Context, Result};
use clap::Args;

use svcgen::Engine;

use super::initialized_context;
use crate::output::Console;
use crate::theme::Tone;

pub const EXAMPLES: &str = "\
Examples:
  svcgen prune        List snapshot entries of removed entities
  svcgen prune --yes  Remove them from the snapshot";

#[derive(Args)]
pub struct PruneArgs {
    /// Remove the entries instead of only listing them
    #[arg(long)]
    yes: bool,
}

pub fn handle_prune(args: PruneArgs, console: &Console) -> Result<()> {
    let ctx = initialized_context()?;
    let mut config = ctx.engine_config();
    config.dry_run = !args.yes;

    let mut engine = Engine::open(config).context("Failed to load snapshot")?;
    let catalog = engine.load_catalog().context("Failed to load schema module")?;

    let orphans = engine.prune(&catalog).context("Failed to rewrite snapshot")?;
    if orphans.is_empty() {
        console.say(Tone::Success, "Snapshot has no orphaned entities");
        return Ok(());
    }

    console.title("Orphaned entities");
    for orphan in &orphans {
        let note = if orphan.exists {
            "file kept"
        } else {
            "file already gone"
        };
        console.item(&format!("{} -> {} ({note})", orphan.key, orphan.artifact));
    }

    if !args.yes {
        console.say(Tone::Info, "Re-run with --yes to remove these snapshot entries");
        return Ok(());
    }
    console.say(Tone::Success, &format!("Removed {} snapshot entries", orphans.len()));
    if orphans.iter().any(|o| o.exists) {
        console.say(Tone::Info, "Generated files are never deleted; remove unused ones by hand");
    }
    Ok(())
}
