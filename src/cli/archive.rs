use super::{local_now, ui, write_output};
use crate::store::export::archive_file_name;
use crate::store::{CsvCache, build_archive};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Packs every cached series into a timestamped ZIP under `output_dir`.
///
/// Returns `None` without writing anything when the cache is empty.
pub fn run(cache: &CsvCache, output_dir: &Path) -> Result<Option<PathBuf>> {
    let artifacts = cache.artifacts()?;
    let count = artifacts.len();

    let Some(bytes) = build_archive(artifacts)? else {
        println!("No cached data to archive in {}", cache.dir().display());
        return Ok(None);
    };

    let path = write_output(output_dir, &archive_file_name(local_now()), &bytes)?;
    println!(
        "Archived {} files ({}) to {}",
        ui::style_text(&count.to_string(), ui::StyleType::TotalValue),
        ui::compact_amount(bytes.len() as f64) + "B",
        ui::style_text(&path.display().to_string(), ui::StyleType::Subtle)
    );
    Ok(Some(path))
}
