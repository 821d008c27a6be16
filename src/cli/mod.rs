pub mod archive;
pub mod clear;
pub mod download;
pub mod pipeline;
pub mod screen;
pub mod setup;
pub mod status;
pub mod tickers;
pub mod ui;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

/// Writes `bytes` to `dir/name`, creating `dir` if needed.
pub(crate) fn write_output(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    let path = dir.join(name);
    std::fs::write(&path, bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}

pub(crate) fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Progress bar callback for the batch runners.
pub(crate) fn progress_callback(pb: &indicatif::ProgressBar) -> impl Fn(usize, usize) + Sync + '_ {
    move |done, _total| pb.set_position(done as u64)
}
