use super::{progress_callback, ui, write_output};
use crate::core::{
    FetchError, Pacer, PriceProvider, ScreenedTicker, Session, SymbolDirectory, Thresholds,
};
use crate::store::export::{SCREENED_FILE_NAME, screened_csv};
use anyhow::Result;
use comfy_table::Cell;
use std::path::{Path, PathBuf};

const DISPLAY_ROWS: usize = 20;

/// Loads the directory, collects summaries and saves the rows passing `thresholds`.
pub async fn run(
    directory: &dyn SymbolDirectory,
    provider: &(dyn PriceProvider + Send + Sync),
    sample: bool,
    thresholds: &Thresholds,
    pacer: &Pacer,
    output_dir: &Path,
) -> Result<PathBuf> {
    let mut session = Session::new();
    session.load_directory(directory).await?;
    screen_session(&mut session, provider, sample, thresholds, pacer).await?;
    save_screened(&session.screened, output_dir)
}

/// Runs the screening step on an already loaded session and reports it.
pub(crate) async fn screen_session(
    session: &mut Session,
    provider: &(dyn PriceProvider + Send + Sync),
    sample: bool,
    thresholds: &Thresholds,
    pacer: &Pacer,
) -> Result<()> {
    let candidates = if sample {
        crate::core::symbol::sample_major(&session.directory).len()
    } else {
        session.directory.len()
    };
    println!(
        "Collecting summaries for {} of {} tickers{}",
        candidates,
        session.directory.len(),
        if sample { " (sample)" } else { "" }
    );

    let pb = ui::new_progress_bar(candidates as u64, true);
    pb.set_message("Screening");
    let failed = session
        .screen(provider, sample, thresholds, pacer, &progress_callback(&pb))
        .await?;
    pb.finish_and_clear();

    println!(
        "{} tickers passed the filters (price >= {}, market cap >= {}, volume >= {})",
        ui::style_text(&session.screened.len().to_string(), ui::StyleType::TotalValue),
        thresholds.min_price,
        ui::compact_amount(thresholds.min_market_cap),
        ui::compact_amount(thresholds.min_volume),
    );
    if !session.screened.is_empty() {
        let shown = session.screened.len().min(DISPLAY_ROWS);
        println!("{}", screened_table(&session.screened[..shown]));
    }
    report_summary_failures(&failed);
    Ok(())
}

pub(crate) fn save_screened(rows: &[ScreenedTicker], output_dir: &Path) -> Result<PathBuf> {
    let path = write_output(output_dir, SCREENED_FILE_NAME, &screened_csv(rows)?)?;
    println!(
        "Saved screened tickers to {}",
        ui::style_text(&path.display().to_string(), ui::StyleType::Subtle)
    );
    Ok(path)
}

fn report_summary_failures(failed: &[(String, FetchError)]) {
    if failed.is_empty() {
        return;
    }
    println!(
        "{}",
        ui::style_text(
            &format!("{} tickers had no usable summary", failed.len()),
            ui::StyleType::Error
        )
    );
}

fn screened_table(rows: &[ScreenedTicker]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Name"),
        ui::header_cell("Last Sale"),
        ui::header_cell("Market Cap"),
        ui::header_cell("Volume"),
    ]);
    for row in rows {
        table.add_row(vec![
            Cell::new(&row.symbol),
            Cell::new(&row.name),
            ui::number_cell(format!("{:.2}", row.last_price)),
            ui::number_cell(ui::compact_amount(row.market_cap)),
            ui::number_cell(ui::compact_amount(row.volume)),
        ]);
    }
    table.to_string()
}
