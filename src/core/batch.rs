//! Sequential batch runners over a symbol list

use super::error::FetchError;
use super::pacing::Pacer;
use super::price::{PriceProvider, RangeSpec, TickerSummary};
use crate::providers::util::{RetryPolicy, with_retry};
use crate::store::CsvCache;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Outcome of one batch run. Every input entry lands in exactly one of
/// `succeeded` or `failed`, both in input order; `cached` lists the
/// succeeded symbols that were already on disk.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub succeeded: Vec<String>,
    pub cached: Vec<String>,
    pub failed: Vec<(String, FetchError)>,
    pub elapsed: Duration,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// First recorded failure for `symbol`.
    pub fn failure(&self, symbol: &str) -> Option<&FetchError> {
        self.failed
            .iter()
            .find_map(|(s, err)| (s == symbol).then_some(err))
    }

    /// Symbols downloaded during this run.
    pub fn fetched(&self) -> impl Iterator<Item = &String> {
        self.succeeded.iter().filter(|s| !self.cached.contains(s))
    }

    /// Items per second, or `None` for an instantaneous run.
    pub fn rate(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        (secs > 0.0).then(|| self.total() as f64 / secs)
    }
}

/// Downloads each symbol not yet cached and writes it to `cache`.
///
/// Symbols are processed one at a time in input order. Failures are
/// recorded and the run continues; `on_progress(done, total)` is called
/// after every symbol.
#[instrument(skip_all, fields(symbols = symbols.len(), range = %range))]
pub async fn run_batch(
    provider: &(dyn PriceProvider + Send + Sync),
    cache: &CsvCache,
    symbols: &[String],
    range: &RangeSpec,
    policy: RetryPolicy,
    pacer: &Pacer,
    on_progress: &(dyn Fn(usize, usize) + Sync),
) -> BatchResult {
    let start = Instant::now();
    let total = symbols.len();
    let mut result = BatchResult::default();

    for (i, symbol) in symbols.iter().enumerate() {
        if !cache.should_fetch(symbol) {
            info!(%symbol, "Already downloaded");
            result.succeeded.push(symbol.clone());
            result.cached.push(symbol.clone());
            on_progress(i + 1, total);
            continue;
        }

        let outcome = with_retry(|| provider.fetch_history(symbol, range), policy)
            .await
            .and_then(|series| {
                cache
                    .write(&series)
                    .map(|_| series.len())
                    .map_err(|e| FetchError::Storage {
                        detail: format!("{e:#}"),
                    })
            });

        match outcome {
            Ok(rows) => {
                info!(%symbol, rows, "Downloaded");
                result.succeeded.push(symbol.clone());
            }
            Err(err) => {
                warn!(%symbol, error = %err, "Download failed");
                result.failed.push((symbol.clone(), err));
            }
        }

        on_progress(i + 1, total);
        pacer.wait_after(i, total).await;
    }

    result.elapsed = start.elapsed();
    info!(
        succeeded = result.succeeded.len(),
        failed = result.failed.len(),
        elapsed = ?result.elapsed,
        "Batch complete"
    );
    result
}

/// Fetches a summary for each symbol, one attempt each, in input order.
///
/// Returns the summaries that succeeded and the failures with their reasons.
#[instrument(skip_all, fields(symbols = symbols.len()))]
pub async fn collect_summaries(
    provider: &(dyn PriceProvider + Send + Sync),
    symbols: &[String],
    pacer: &Pacer,
    on_progress: &(dyn Fn(usize, usize) + Sync),
) -> (Vec<TickerSummary>, Vec<(String, FetchError)>) {
    let total = symbols.len();
    let mut summaries = Vec::new();
    let mut failed = Vec::new();

    for (i, symbol) in symbols.iter().enumerate() {
        match provider.fetch_summary(symbol).await {
            Ok(summary) => summaries.push(summary),
            Err(err) => {
                warn!(%symbol, error = %err, "Summary fetch failed");
                failed.push((symbol.clone(), err));
            }
        }
        on_progress(i + 1, total);
        pacer.wait_after(i, total).await;
    }

    info!(
        collected = summaries.len(),
        failed = failed.len(),
        "Summary collection complete"
    );
    (summaries, failed)
}
