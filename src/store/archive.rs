//! In-memory ZIP packaging of per-symbol CSV artifacts

use crate::core::PriceSeries;
use anyhow::{Context, Result};
use std::io::{Cursor, Write};
use tracing::debug;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Writes one `{name}.csv` entry per input pair, in input order.
///
/// Returns `None` when there is nothing to package, so callers can skip
/// offering a download.
pub fn build_archive<I, N, B>(entries: I) -> Result<Option<Vec<u8>>>
where
    I: IntoIterator<Item = (N, B)>,
    N: AsRef<str>,
    B: AsRef<[u8]>,
{
    let mut entries = entries.into_iter().peekable();
    if entries.peek().is_none() {
        return Ok(None);
    }

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut count = 0;
    for (name, bytes) in entries {
        let entry_name = format!("{}.csv", name.as_ref());
        writer
            .start_file(entry_name.as_str(), options)
            .with_context(|| format!("Failed to start archive entry: {entry_name}"))?;
        writer
            .write_all(bytes.as_ref())
            .with_context(|| format!("Failed to write archive entry: {entry_name}"))?;
        count += 1;
    }

    let cursor = writer.finish().context("Failed to finalize archive")?;
    debug!("Built archive with {} entries", count);
    Ok(Some(cursor.into_inner()))
}

/// Serializes each series to canonical CSV, keyed by its symbol.
pub fn series_entries<'a, I>(series: I) -> Result<Vec<(String, Vec<u8>)>>
where
    I: IntoIterator<Item = &'a PriceSeries>,
{
    series
        .into_iter()
        .map(|s| Ok((s.symbol.clone(), s.to_csv()?)))
        .collect()
}
