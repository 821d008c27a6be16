//! Joins listing metadata with recent summaries and applies threshold filters

use super::price::TickerSummary;
use super::symbol::TickerMetadata;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub min_price: f64,
    pub min_market_cap: f64,
    pub min_volume: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            min_price: 5.0,
            min_market_cap: 10_000_000_000.0,
            min_volume: 100_000.0,
        }
    }
}

/// A listing enriched with its summary figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenedTicker {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Market Category")]
    pub market_category: String,
    #[serde(rename = "Exchange")]
    pub exchange: String,
    #[serde(rename = "Last Sale")]
    pub last_price: f64,
    #[serde(rename = "Market Cap")]
    pub market_cap: f64,
    #[serde(rename = "Volume")]
    pub volume: f64,
}

impl Thresholds {
    pub fn accepts(&self, row: &ScreenedTicker) -> bool {
        row.last_price >= self.min_price
            && row.market_cap >= self.min_market_cap
            && row.volume >= self.min_volume
    }
}

/// Inner join on symbol (metadata order), then keep rows meeting all three thresholds.
///
/// A non-empty summary name wins over the directory name.
pub fn merge_and_filter(
    metadata: &[TickerMetadata],
    summaries: &[TickerSummary],
    thresholds: &Thresholds,
) -> Vec<ScreenedTicker> {
    let by_symbol: HashMap<&str, &TickerSummary> =
        summaries.iter().map(|s| (s.symbol.as_str(), s)).collect();

    metadata
        .iter()
        .filter_map(|meta| {
            let summary = by_symbol.get(meta.symbol.as_str())?;
            let name = summary
                .name
                .as_deref()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(&meta.name)
                .to_string();
            Some(ScreenedTicker {
                symbol: meta.symbol.clone(),
                name,
                market_category: meta.market_category.clone(),
                exchange: meta.exchange.clone(),
                last_price: summary.last_price,
                market_cap: summary.market_cap,
                volume: summary.avg_volume,
            })
        })
        .filter(|row| thresholds.accepts(row))
        .collect()
}
