use super::download::SymbolSource;
use super::ui;
use crate::store::CsvCache;
use anyhow::Result;

const PER_LINE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    pub total: usize,
    pub downloaded: usize,
    pub cached: Vec<String>,
}

impl CacheStatus {
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.downloaded)
    }
}

/// Compares the cache against `source`, or reports the cache alone.
pub fn collect(cache: &CsvCache, source: Option<&SymbolSource>) -> Result<CacheStatus> {
    let cached = cache.symbols()?;
    let status = match source {
        Some(source) => {
            let wanted = source.load()?;
            CacheStatus {
                total: wanted.len(),
                downloaded: wanted.iter().filter(|s| !cache.should_fetch(s)).count(),
                cached,
            }
        }
        None => CacheStatus {
            total: cached.len(),
            downloaded: cached.len(),
            cached,
        },
    };
    Ok(status)
}

pub fn run(cache: &CsvCache, source: Option<&SymbolSource>) -> Result<CacheStatus> {
    let status = collect(cache, source)?;

    println!("Cache: {}", ui::style_text(&cache.dir().display().to_string(), ui::StyleType::Subtle));
    println!(
        "{} {}   {} {}   {} {}",
        ui::style_text("Total:", ui::StyleType::TotalLabel),
        status.total,
        ui::style_text("Downloaded:", ui::StyleType::TotalLabel),
        ui::style_text(&status.downloaded.to_string(), ui::StyleType::TotalValue),
        ui::style_text("Remaining:", ui::StyleType::TotalLabel),
        status.remaining(),
    );

    if !status.cached.is_empty() {
        println!("\nCached tickers:");
        for line in status.cached.chunks(PER_LINE) {
            println!("  {}", line.join(", "));
        }
    }
    Ok(status)
}
