use super::ui;
use crate::store::CsvCache;
use anyhow::{Context, Result};

/// Deletes the cached CSV files after confirmation. Returns how many were removed.
pub fn run(cache: &CsvCache, assume_yes: bool) -> Result<usize> {
    let count = cache.symbols()?.len();
    if count == 0 {
        println!("Cache is already empty.");
        return Ok(0);
    }

    if !assume_yes && !confirm(&format!(
        "Delete {count} cached files from {}? [y/N] ",
        cache.dir().display()
    ))? {
        println!("Aborted.");
        return Ok(0);
    }

    let removed = cache.clear()?;
    println!(
        "Removed {} cached files",
        ui::style_text(&removed.to_string(), ui::StyleType::TotalValue)
    );
    Ok(removed)
}

fn confirm(prompt: &str) -> Result<bool> {
    let term = console::Term::stdout();
    term.write_str(prompt)?;
    let answer = term.read_line().context("Failed to read confirmation")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
