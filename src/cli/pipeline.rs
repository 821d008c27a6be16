use super::{download, local_now, screen, ui, write_output};
use crate::core::config::AppConfig;
use crate::core::{BatchResult, PriceProvider, Session, SymbolDirectory};
use crate::store::CsvCache;
use crate::store::export::{archive_file_name, ticker_list_csv, ticker_list_file_name};
use anyhow::Result;
use std::path::Path;

/// Directory, screen, download and archive in one run, sharing a [`Session`].
pub async fn run(
    directory: &dyn SymbolDirectory,
    provider: &(dyn PriceProvider + Send + Sync),
    cache: &CsvCache,
    config: &AppConfig,
    sample: bool,
    output_dir: &Path,
) -> Result<BatchResult> {
    let mut session = Session::new();

    println!("{}", ui::style_text("Step 1: symbol directory", ui::StyleType::Title));
    let count = session.load_directory(directory).await?;
    let listings = write_output(
        output_dir,
        &ticker_list_file_name(local_now()),
        &ticker_list_csv(&session.directory)?,
    )?;
    println!("Fetched {count} tickers, saved to {}", listings.display());

    ui::print_separator();
    println!("{}", ui::style_text("Step 2: screening", ui::StyleType::Title));
    let thresholds = config.screen.thresholds();
    screen::screen_session(
        &mut session,
        provider,
        sample,
        &thresholds,
        &config.screen.pacer(),
    )
    .await?;
    screen::save_screened(&session.screened, output_dir)?;

    ui::print_separator();
    println!("{}", ui::style_text("Step 3: price history", ui::StyleType::Title));
    let symbols = session.screened_symbols();
    let pb = ui::new_progress_bar(symbols.len() as u64, true);
    pb.set_message("Downloading");
    let result = session
        .download(
            provider,
            cache,
            &config.download.range(),
            config.download.retry_policy(),
            &config.download.pacer(),
            &super::progress_callback(&pb),
        )
        .await?;
    pb.finish_and_clear();
    download::display_results(&result);

    ui::print_separator();
    println!("{}", ui::style_text("Step 4: archive", ui::StyleType::Title));
    match session.archive()? {
        Some(bytes) => {
            let path = write_output(output_dir, &archive_file_name(local_now()), &bytes)?;
            println!(
                "Archived {} series to {}",
                session.series.len(),
                ui::style_text(&path.display().to_string(), ui::StyleType::Subtle)
            );
        }
        None => println!("Nothing downloaded, no archive written."),
    }
    Ok(result)
}
