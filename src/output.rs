//! User-facing terminal output
//!
//! Messages go to stderr so that stdout carries only results, which keeps
//! `--json` output pipeable.

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::models::DirectoryEntry;

/// Display a warning message in yellow, padded by blank lines
pub fn warn(message: &str) {
    eprintln!("\n{}\n", message.yellow());
}

/// Display an error message in red, padded by blank lines
pub fn error(message: &str) {
    eprintln!("\n{}\n", message.red());
}

/// Print entries as `SYMBOL - Name` lines
pub fn entries(entries: &[DirectoryEntry]) {
    for entry in entries {
        println!("{}", format_entry(entry));
    }
}

/// Print entries as a JSON array (minified unless `pretty`)
pub fn json(entries: &[DirectoryEntry], pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(entries)?
    } else {
        serde_json::to_string(entries)?
    };
    println!("{}", json);
    Ok(())
}

fn format_entry(entry: &DirectoryEntry) -> String {
    if entry.name.is_empty() {
        return entry.symbol.cyan().bold().to_string();
    }
    format!("{} - {}", entry.symbol.cyan().bold(), entry.name)
}
