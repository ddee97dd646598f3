//! Rendering of command results as tables, JSON or one-liners.

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Attribute, Cell, Color as TableColor, Table, presets};
use serde::Serialize;

use crate::theme::Tone;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table (default)
    #[default]
    Table,
    /// Pretty-printed JSON, for scripts
    Json,
    /// A single summary line
    Compact,
}

/// A command result that can be shown in every output format.
pub trait Report: Serialize {
    fn table(&self, console: &Console) -> Table;
    fn compact(&self) -> String;
}

/// Where command output goes, and how it looks.
pub struct Console {
    format: OutputFormat,
    quiet: bool,
    verbose: bool,
    color: bool,
}

impl Console {
    pub fn new(format: OutputFormat, quiet: bool, verbose: bool, color: bool) -> Self {
        Self {
            format,
            quiet,
            verbose,
            color,
        }
    }

    /// Status messages are only printed next to human-readable output.
    fn chatty(&self) -> bool {
        !self.quiet && self.format != OutputFormat::Json
    }

    pub fn report<R: Report>(&self, report: &R) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
            OutputFormat::Table => println!("{}", report.table(self)),
            OutputFormat::Compact => println!("{}", report.compact()),
        }
        Ok(())
    }

    /// Print a one-line message; errors always go to stderr.
    pub fn say(&self, tone: Tone, message: &str) {
        if tone == Tone::Error {
            eprintln!("{}", tone.line(message, self.color));
        } else if self.chatty() {
            println!("{}", tone.line(message, self.color));
        }
    }

    /// Extra detail shown with `--verbose`.
    pub fn detail(&self, message: &str) {
        if self.verbose && !self.quiet {
            eprintln!("{}", Tone::Quiet.line(message, self.color));
        }
    }

    pub fn title(&self, text: &str) {
        if !self.chatty() {
            return;
        }
        if self.color {
            println!("{}", text.bold().underline());
        } else {
            println!("{text}");
        }
    }

    /// Indented list entry under the previous message.
    pub fn item(&self, text: &str) {
        if self.chatty() {
            println!("    - {text}");
        }
    }

    /// Empty table with a bold header row.
    pub fn table(&self, headers: &[&str]) -> Table {
        let mut table = Table::new();
        table.load_preset(if self.color {
            presets::UTF8_FULL_CONDENSED
        } else {
            presets::ASCII_FULL
        });
        table.set_header(headers.iter().map(|h| Cell::new(h).add_attribute(Attribute::Bold)));
        table
    }

    /// Color a cell unless color is off.
    pub fn tint(&self, cell: Cell, color: TableColor) -> Cell {
        if self.color { cell.fg(color) } else { cell }
    }
}
