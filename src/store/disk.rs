use crate::core::PriceSeries;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory of `{SYMBOL}.csv` price artifacts.
///
/// Presence of a file is the only freshness signal: once written, a symbol
/// is never fetched again until the file is removed.
#[derive(Debug, Clone)]
pub struct CsvCache {
    dir: PathBuf,
}

impl CsvCache {
    /// Opens the cache, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;
        Ok(CsvCache { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol.to_uppercase()))
    }

    pub fn should_fetch(&self, symbol: &str) -> bool {
        let cached = self.path_for(symbol).exists();
        if cached {
            debug!("Cache HIT for symbol: {}", symbol);
        } else {
            debug!("Cache MISS for symbol: {}", symbol);
        }
        !cached
    }

    pub fn write(&self, series: &PriceSeries) -> Result<PathBuf> {
        let path = self.path_for(&series.symbol);
        let bytes = series.to_csv()?;
        fs::write(&path, bytes)
            .with_context(|| format!("Failed to write cache file: {}", path.display()))?;
        debug!("Cache PUT for symbol: {} ({} rows)", series.symbol, series.len());
        Ok(path)
    }

    pub fn read(&self, symbol: &str) -> Result<PriceSeries> {
        let path = self.path_for(symbol);
        let file = fs::File::open(&path)
            .with_context(|| format!("Failed to open cache file: {}", path.display()))?;
        PriceSeries::from_csv(symbol, file)
    }

    fn csv_files(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list cache directory: {}", self.dir.display()))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Symbols with an artifact on disk, sorted.
    pub fn symbols(&self) -> Result<Vec<String>> {
        Ok(self
            .csv_files()?
            .iter()
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect())
    }

    /// Raw bytes of every artifact keyed by symbol, sorted by symbol.
    pub fn artifacts(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let mut artifacts = Vec::new();
        for path in self.csv_files()? {
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            let bytes = fs::read(&path)
                .with_context(|| format!("Failed to read cache file: {}", path.display()))?;
            artifacts.push((stem, bytes));
        }
        Ok(artifacts)
    }

    /// Deletes every artifact. Returns how many files were removed.
    pub fn clear(&self) -> Result<usize> {
        let files = self.csv_files()?;
        for path in &files {
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove cache file: {}", path.display()))?;
        }
        debug!("Cleared {} cache files", files.len());
        Ok(files.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DailyBar;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn series(symbol: &str) -> PriceSeries {
        PriceSeries::new(
            symbol,
            vec![DailyBar {
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                open: 1.0,
                high: 2.0,
                low: 0.5,
                close: 1.5,
                volume: 10,
            }],
        )
    }

    #[test]
    fn test_should_fetch_until_written() -> Result<()> {
        let dir = tempdir()?;
        let cache = CsvCache::open(dir.path())?;

        assert!(cache.should_fetch("AAPL"));
        cache.write(&series("AAPL"))?;
        assert!(!cache.should_fetch("AAPL"));
        assert!(!cache.should_fetch("aapl"));
        assert!(dir.path().join("AAPL.csv").exists());
        Ok(())
    }

    #[test]
    fn test_presence_alone_suppresses_fetch() -> Result<()> {
        let dir = tempdir()?;
        let cache = CsvCache::open(dir.path())?;

        // A truncated file still counts as downloaded
        fs::write(dir.path().join("TSLA.csv"), "Date,Op")?;
        assert!(!cache.should_fetch("TSLA"));
        Ok(())
    }

    #[test]
    fn test_read_back_written_series() -> Result<()> {
        let dir = tempdir()?;
        let cache = CsvCache::open(dir.path())?;
        let original = series("MSFT");
        cache.write(&original)?;
        assert_eq!(cache.read("MSFT")?, original);
        Ok(())
    }

    #[test]
    fn test_symbols_and_artifacts_ignore_other_files() -> Result<()> {
        let dir = tempdir()?;
        let cache = CsvCache::open(dir.path())?;
        cache.write(&series("MSFT"))?;
        cache.write(&series("AAPL"))?;
        fs::write(dir.path().join("notes.txt"), "ignore me")?;

        assert_eq!(cache.symbols()?, vec!["AAPL", "MSFT"]);
        let artifacts = cache.artifacts()?;
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].0, "AAPL");
        assert_eq!(artifacts[0].1, fs::read(dir.path().join("AAPL.csv"))?);
        Ok(())
    }

    #[test]
    fn test_clear_removes_only_artifacts() -> Result<()> {
        let dir = tempdir()?;
        let cache = CsvCache::open(dir.path())?;
        cache.write(&series("AAPL"))?;
        cache.write(&series("MSFT"))?;
        fs::write(dir.path().join("notes.txt"), "keep")?;

        assert_eq!(cache.clear()?, 2);
        assert!(cache.symbols()?.is_empty());
        assert!(cache.should_fetch("AAPL"));
        assert!(dir.path().join("notes.txt").exists());
        Ok(())
    }
}
