//! Message tones and help colors.

use clap::builder::styling::{AnsiColor, Effects, Styles};
use colored::{Color, Colorize};
use once_cell::sync::Lazy;

/// Kind of a one-line status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Error,
    Warning,
    Info,
    /// Secondary detail, e.g. verbose output or user-owned members
    Quiet,
}

impl Tone {
    pub fn glyph(self) -> &'static str {
        match self {
            Tone::Success => "✓",
            Tone::Error => "✗",
            Tone::Warning => "⚠",
            Tone::Info => "ℹ",
            Tone::Quiet => "·",
        }
    }

    fn color(self) -> Color {
        match self {
            Tone::Success => Color::Green,
            Tone::Error => Color::Red,
            Tone::Warning => Color::Yellow,
            Tone::Info => Color::Blue,
            Tone::Quiet => Color::BrightBlack,
        }
    }

    /// `glyph message`, colored when `color` is set.
    pub fn line(self, message: &str, color: bool) -> String {
        if color {
            let tint = self.color();
            format!("{} {}", self.glyph().color(tint).bold(), message.color(tint))
        } else {
            format!("{} {message}", self.glyph())
        }
    }
}

/// Help and usage styling.
pub static HELP_STYLES: Lazy<Styles> = Lazy::new(|| {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .usage(AnsiColor::BrightBlue.on_default().effects(Effects::BOLD))
        .literal(AnsiColor::Magenta.on_default())
        .placeholder(AnsiColor::BrightBlack.on_default())
        .error(AnsiColor::Red.on_default().effects(Effects::BOLD))
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Yellow.on_default())
});
