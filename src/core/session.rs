//! Caller-owned state carried between the pipeline steps

use super::batch::{BatchResult, collect_summaries, run_batch};
use super::error::FetchError;
use super::pacing::Pacer;
use super::price::{PriceProvider, PriceSeries, RangeSpec};
use super::screen::{ScreenedTicker, Thresholds, merge_and_filter};
use super::symbol::{SymbolDirectory, TickerMetadata, sample_major};
use crate::providers::util::RetryPolicy;
use crate::store::{CsvCache, build_archive, series_entries};
use anyhow::{Result, bail};
use tracing::{info, warn};

/// Results of the directory, screen and download steps of one run.
///
/// Each step reads what the previous one left here.
#[derive(Debug, Default)]
pub struct Session {
    pub directory: Vec<TickerMetadata>,
    pub screened: Vec<ScreenedTicker>,
    pub series: Vec<PriceSeries>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load_directory(&mut self, directory: &dyn SymbolDirectory) -> Result<usize> {
        self.directory = directory.fetch_listings().await?;
        self.screened.clear();
        self.series.clear();
        info!(tickers = self.directory.len(), "Loaded symbol directory");
        Ok(self.directory.len())
    }

    /// Collects summaries for the loaded directory (or its major-ticker
    /// sample) and keeps the rows passing `thresholds`.
    ///
    /// Returns the symbols whose summaries could not be fetched.
    pub async fn screen(
        &mut self,
        provider: &(dyn PriceProvider + Send + Sync),
        sample: bool,
        thresholds: &Thresholds,
        pacer: &Pacer,
        on_progress: &(dyn Fn(usize, usize) + Sync),
    ) -> Result<Vec<(String, FetchError)>> {
        if self.directory.is_empty() {
            bail!("No symbol directory loaded");
        }
        let candidates = if sample {
            sample_major(&self.directory)
        } else {
            self.directory.clone()
        };
        let symbols: Vec<String> = candidates.iter().map(|t| t.symbol.clone()).collect();

        let (summaries, failed) = collect_summaries(provider, &symbols, pacer, on_progress).await;
        self.screened = merge_and_filter(&candidates, &summaries, thresholds);
        info!(
            collected = summaries.len(),
            passed = self.screened.len(),
            "Screening complete"
        );
        Ok(failed)
    }

    pub fn screened_symbols(&self) -> Vec<String> {
        self.screened.iter().map(|t| t.symbol.clone()).collect()
    }

    /// Downloads the screened symbols through the cache and keeps the
    /// resulting series, in screened order.
    pub async fn download(
        &mut self,
        provider: &(dyn PriceProvider + Send + Sync),
        cache: &CsvCache,
        range: &RangeSpec,
        policy: RetryPolicy,
        pacer: &Pacer,
        on_progress: &(dyn Fn(usize, usize) + Sync),
    ) -> Result<BatchResult> {
        let symbols = self.screened_symbols();
        let result = run_batch(provider, cache, &symbols, range, policy, pacer, on_progress).await;

        self.series.clear();
        for symbol in &result.succeeded {
            match cache.read(symbol) {
                Ok(series) => self.series.push(series),
                Err(e) => warn!(%symbol, error = %e, "Could not load cached series"),
            }
        }
        Ok(result)
    }

    /// ZIP of the series held by this session, or `None` when there are none.
    pub fn archive(&self) -> Result<Option<Vec<u8>>> {
        build_archive(series_entries(&self.series)?)
    }
}
