use anyhow::{Context, Result};
use clap::Args;

use crate::context::{ProjectContext, SvcgenConfig};
use crate::output::Console;
use crate::theme::Tone;

pub const EXAMPLES: &str = "\
Examples:
  svcgen init                                 Write .svcgen/config.toml with defaults
  svcgen init --schema-file src/db/tables.rs  Scan a different schema module
  svcgen init --force                         Overwrite an existing config";

#[derive(Args)]
pub struct InitArgs {
    /// Schema module to scan, relative to the project root
    #[arg(long)]
    schema_file: Option<String>,

    /// Directory generated services are written to
    #[arg(long)]
    output_dir: Option<String>,

    /// Overwrite an existing configuration
    #[arg(long)]
    force: bool,
}

pub fn handle_init(args: InitArgs, console: &Console) -> Result<()> {
    let ctx = ProjectContext::find()?;

    if ctx.is_initialized() && !args.force {
        console.say(
            Tone::Warning,
            &format!(
                "Already initialized at {}; use --force to overwrite",
                ctx.config_path.display()
            ),
        );
        return Ok(());
    }

    let mut config = SvcgenConfig::default();
    if let Some(schema_file) = args.schema_file {
        config.generator.schema_file = schema_file;
    }
    if let Some(output_dir) = args.output_dir {
        config.generator.output_dir = output_dir;
    }

    std::fs::create_dir_all(&ctx.svcgen_dir)
        .with_context(|| format!("Failed to create {}", ctx.svcgen_dir.display()))?;
    let content = toml::to_string_pretty(&config).context("Failed to serialize config")?;
    std::fs::write(&ctx.config_path, content)
        .with_context(|| format!("Failed to write {}", ctx.config_path.display()))?;

    console.say(Tone::Success, &format!("Wrote {}", ctx.config_path.display()));
    console.item(&format!("schema module: {}", config.generator.schema_file));
    console.item(&format!("output directory: {}", config.generator.output_dir));
    console.item(&format!("snapshot: {}", config.generator.snapshot_file));

    if !ctx.project_root.join(&config.generator.schema_file).exists() {
        console.say(Tone::Warning, &format!("{} does not exist yet", config.generator.schema_file));
    }
    console.say(Tone::Info, "Run 'svcgen generate' to create services");
    Ok(())
}
