use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Color as TableColor, Table};

use svcgen::{Engine, RunReport};

use super::initialized_context;
use crate::output::{Console, Report};
use crate::theme::Tone;

pub const EXAMPLES: &str = "\
Examples:
  svcgen generate                Regenerate entities whose schema changed
  svcgen generate --force        Regenerate every entity
  svcgen generate --dry-run      Show what would change without writing
  svcgen generate --output json  Machine-readable run report";

#[derive(Args)]
pub struct GenerateArgs {
    /// Regenerate every entity, ignoring the snapshot
    #[arg(long)]
    force: bool,

    /// Run every step but write nothing
    #[arg(long)]
    dry_run: bool,
}

pub fn handle_generate(args: GenerateArgs, console: &Console) -> Result<()> {
    let ctx = initialized_context()?;
    let mut config = ctx.engine_config();
    config.force = args.force;
    config.dry_run = args.dry_run;

    let mut engine = Engine::open(config).context("Failed to load snapshot")?;
    let catalog = engine.load_catalog().with_context(|| {
        format!("Failed to load schema module {}", engine.config().schema_path().display())
    })?;
    console.detail(&format!("{} entities in {}", catalog.len(), catalog.path().display()));

    let report = engine.run(&catalog).context("Failed to commit snapshot")?;
    console.report(&report)?;

    for custom in &report.skipped_custom {
        let member = format!("{}::{}", custom.entity, custom.member);
        console.say(Tone::Quiet, &format!("{member} is user-owned, left as written"));
    }

    if report.has_failures() {
        for failed in &report.failed {
            console.say(Tone::Error, &format!("{}: {}", failed.entity, failed.reason));
        }
        anyhow::bail!("{} entities failed", report.failed.len());
    }

    if report.committed {
        console.say(Tone::Success, &report.summary());
    } else {
        console.say(Tone::Info, &format!("Dry run, nothing written: {}", report.summary()));
    }
    Ok(())
}

impl Report for RunReport {
    fn table(&self, console: &Console) -> Table {
        let mut table = console.table(&["Entity", "Result"]);

        let groups: [(&[String], &str, TableColor); 4] = [
            (&self.created, "created", TableColor::Green),
            (&self.updated, "updated", TableColor::Yellow),
            (&self.unchanged, "unchanged", TableColor::Reset),
            (&self.skipped_unchanged, "skipped", TableColor::DarkGrey),
        ];
        for (keys, label, color) in groups {
            for key in keys {
                table.add_row(vec![Cell::new(key), console.tint(Cell::new(label), color)]);
            }
        }
        for failed in &self.failed {
            let result = console.tint(Cell::new("failed"), TableColor::Red);
            table.add_row(vec![Cell::new(&failed.entity), result]);
        }
        table
    }

    fn compact(&self) -> String {
        self.summary()
    }
}
