use super::{progress_callback, ui};
use crate::core::{BatchResult, Pacer, Period, PriceProvider, RangeSpec, parse_symbol_list, run_batch};
use crate::providers::RetryPolicy;
use crate::store::CsvCache;
use crate::store::export::load_screened;
use anyhow::{Context, Result, bail};
use chrono::{Days, NaiveDate};
use comfy_table::Cell;
use std::path::PathBuf;

/// Where the symbols of a download run come from.
#[derive(Debug, Clone)]
pub enum SymbolSource {
    /// One symbol per line.
    List(PathBuf),
    /// A screened export with a `Symbol` column.
    Screened(PathBuf),
}

impl SymbolSource {
    pub fn load(&self) -> Result<Vec<String>> {
        match self {
            SymbolSource::List(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read symbol list: {}", path.display()))?;
                Ok(parse_symbol_list(&content))
            }
            SymbolSource::Screened(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("Failed to read screened file: {}", path.display()))?;
                let symbols: Vec<String> = load_screened(&bytes)?
                    .into_iter()
                    .map(|row| row.symbol)
                    .collect();
                Ok(parse_symbol_list(&symbols.join("\n")))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub source: SymbolSource,
    pub period: Option<Period>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub limit: Option<usize>,
}

impl DownloadOptions {
    /// An explicit start date wins over a period; the end defaults to tomorrow
    /// so that today's bar is included.
    pub fn resolve_range(&self, default_period: Period, today: NaiveDate) -> Result<RangeSpec> {
        match (self.start, self.end) {
            (Some(start), end) => {
                let end = end.unwrap_or_else(|| today.checked_add_days(Days::new(1)).unwrap_or(today));
                if end <= start {
                    bail!("End date {end} must be after start date {start}");
                }
                Ok(RangeSpec::Between { start, end })
            }
            (None, Some(_)) => bail!("--end requires --start"),
            (None, None) => Ok(RangeSpec::Period(self.period.unwrap_or(default_period))),
        }
    }
}

pub async fn run(
    provider: &(dyn PriceProvider + Send + Sync),
    cache: &CsvCache,
    symbols: &[String],
    range: &RangeSpec,
    policy: RetryPolicy,
    pacer: &Pacer,
) -> Result<BatchResult> {
    if symbols.is_empty() {
        println!("No symbols to download.");
        return Ok(BatchResult::default());
    }
    println!(
        "Downloading {} symbols ({}) into {}",
        symbols.len(),
        range,
        cache.dir().display()
    );

    let pb = ui::new_progress_bar(symbols.len() as u64, true);
    pb.set_message("Downloading");
    let result = run_batch(provider, cache, symbols, range, policy, pacer, &progress_callback(&pb)).await;
    pb.finish_and_clear();

    display_results(&result);
    Ok(result)
}

/// Reads `source`, applies `limit` and runs the download.
pub async fn run_from_source(
    provider: &(dyn PriceProvider + Send + Sync),
    cache: &CsvCache,
    options: &DownloadOptions,
    range: &RangeSpec,
    policy: RetryPolicy,
    pacer: &Pacer,
) -> Result<BatchResult> {
    let mut symbols = options.source.load()?;
    if let Some(limit) = options.limit {
        symbols.truncate(limit);
    }
    run(provider, cache, &symbols, range, policy, pacer).await
}

pub(crate) fn display_results(result: &BatchResult) {
    println!(
        "\n{} {}   {} {}   {} {}",
        ui::style_text("Succeeded:", ui::StyleType::TotalLabel),
        ui::style_text(&result.succeeded.len().to_string(), ui::StyleType::TotalValue),
        ui::style_text("Cached:", ui::StyleType::TotalLabel),
        result.cached.len(),
        ui::style_text("Failed:", ui::StyleType::TotalLabel),
        ui::style_text(
            &result.failed.len().to_string(),
            if result.failed.is_empty() {
                ui::StyleType::TotalValue
            } else {
                ui::StyleType::Error
            }
        ),
    );

    let rate = result
        .rate()
        .map_or("n/a".to_string(), |r| format!("{r:.2} symbols/s"));
    println!(
        "{}",
        ui::style_text(
            &format!("Elapsed: {:.1}s ({rate})", result.elapsed.as_secs_f64()),
            ui::StyleType::Subtle
        )
    );

    if result.failed.is_empty() {
        return;
    }
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Kind"),
        ui::header_cell("Reason"),
    ]);
    for (symbol, err) in &result.failed {
        table.add_row(vec![
            Cell::new(symbol),
            Cell::new(err.kind()),
            Cell::new(err.to_string()),
        ]);
    }
    println!("\nFailure details:\n{table}");
}
