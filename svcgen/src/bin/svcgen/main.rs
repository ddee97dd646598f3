mod commands;
mod context;
mod output;
mod theme;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::control::ShouldColorize;

use commands::generate::GenerateArgs;
use commands::init::InitArgs;
use commands::prune::PruneArgs;
use output::{Console, OutputFormat};
use theme::{HELP_STYLES, Tone};

const ENVIRONMENT: &str = "\
Environment:
  RUST_LOG   Engine log filter, e.g. RUST_LOG=svcgen=debug
  NO_COLOR   Disable colored output";

/// Schema-driven service generator
///
/// Keeps one data-access service per entity table of a schema module in
/// sync with it. Only entities whose schema changed are regenerated, files
/// are patched in place, and a method whose ownership marker line was
/// deleted is never rewritten.
#[derive(Parser)]
#[command(name = "svcgen", version, styles = HELP_STYLES.clone())]
#[command(after_long_help = ENVIRONMENT, arg_required_else_help = true)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print extra detail
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write .svcgen/config.toml for the current project
    #[command(after_long_help = commands::init::EXAMPLES)]
    Init(InitArgs),

    /// Create or update services from the schema module
    #[command(after_long_help = commands::generate::EXAMPLES)]
    Generate(GenerateArgs),

    /// Show which services are stale, new or orphaned
    #[command(after_long_help = commands::status::EXAMPLES)]
    Status,

    /// Forget snapshot entries of entities no longer in the schema
    #[command(after_long_help = commands::prune::EXAMPLES)]
    Prune(PruneArgs),
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }
    let color = !cli.no_color && ShouldColorize::from_env().should_colorize();
    let console = Console::new(cli.output, cli.quiet, cli.verbose, color);

    if let Err(err) = dispatch(cli.command, &console) {
        console.say(Tone::Error, &format!("{err:#}"));
        std::process::exit(1);
    }
}

fn dispatch(command: Command, console: &Console) -> Result<()> {
    match command {
        Command::Init(args) => commands::init::handle_init(args, console),
        Command::Generate(args) => commands::generate::handle_generate(args, console),
        Command::Status => commands::status::handle_status(console),
        Command::Prune(args) => commands::prune::handle_prune(args, console),
    }
}
