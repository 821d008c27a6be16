use super::{local_now, ui, write_output};
use crate::core::{SymbolDirectory, TickerMetadata};
use crate::store::export::{ticker_list_csv, ticker_list_file_name};
use anyhow::Result;
use comfy_table::Cell;
use std::path::{Path, PathBuf};

const SAMPLE_ROWS: usize = 10;

/// Downloads the symbol directory, shows a sample and saves the full list.
pub async fn run(directory: &dyn SymbolDirectory, output_dir: &Path) -> Result<PathBuf> {
    let listings = directory.fetch_listings().await?;

    println!(
        "Fetched {} tickers",
        ui::style_text(&listings.len().to_string(), ui::StyleType::TotalValue)
    );
    if !listings.is_empty() {
        println!("{}", listing_table(&listings[..listings.len().min(SAMPLE_ROWS)]));
    }

    let path = write_output(
        output_dir,
        &ticker_list_file_name(local_now()),
        &ticker_list_csv(&listings)?,
    )?;
    println!(
        "Saved ticker list to {}",
        ui::style_text(&path.display().to_string(), ui::StyleType::Subtle)
    );
    Ok(path)
}

fn listing_table(rows: &[TickerMetadata]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Name"),
        ui::header_cell("Market Category"),
        ui::header_cell("Exchange"),
    ]);
    for row in rows {
        table.add_row(vec![
            Cell::new(&row.symbol),
            Cell::new(&row.name),
            Cell::new(&row.market_category),
            Cell::new(&row.exchange),
        ]);
    }
    table.to_string()
}
