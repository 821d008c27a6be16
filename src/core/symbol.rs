//! Ticker symbols and listing metadata

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Large caps considered by sample-mode screening.
pub const MAJOR_TICKERS: [&str; 20] = [
    "AAPL", "MSFT", "GOOGL", "AMZN", "META", "TSLA", "NVDA", "JPM", "JNJ", "V", "WMT", "PG", "MA",
    "HD", "DIS", "NFLX", "PYPL", "INTC", "CSCO", "PFE",
];

/// One row of the exchange symbol directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerMetadata {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Market Category")]
    pub market_category: String,
    #[serde(rename = "Exchange")]
    pub exchange: String,
}

#[async_trait]
pub trait SymbolDirectory: Send + Sync {
    async fn fetch_listings(&self) -> Result<Vec<TickerMetadata>>;
}

/// Parses a newline-delimited symbol list.
///
/// Symbols are trimmed and uppercased, blank lines are skipped and repeats
/// are dropped keeping the first occurrence.
pub fn parse_symbol_list(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    content
        .lines()
        .map(|line| line.trim().to_uppercase())
        .filter(|symbol| !symbol.is_empty())
        .filter(|symbol| seen.insert(symbol.clone()))
        .collect()
}

/// Keeps directory rows whose symbol is in [`MAJOR_TICKERS`], in directory order.
pub fn sample_major(listings: &[TickerMetadata]) -> Vec<TickerMetadata> {
    listings
        .iter()
        .filter(|t| MAJOR_TICKERS.contains(&t.symbol.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbol_list() {
        let content = "aapl\n\n  msft \r\nAAPL\nbrk.b\n   \n";
        assert_eq!(parse_symbol_list(content), vec!["AAPL", "MSFT", "BRK.B"]);
    }

    #[test]
    fn test_parse_empty_list() {
        assert!(parse_symbol_list("\n\n").is_empty());
    }

    #[test]
    fn test_sample_major_keeps_directory_order() {
        let row = |s: &str| TickerMetadata {
            symbol: s.to_string(),
            name: format!("{s} Inc"),
            market_category: "Q".to_string(),
            exchange: "NASDAQ".to_string(),
        };
        let listings = vec![row("ZZZ"), row("MSFT"), row("AAPL")];
        let sample = sample_major(&listings);
        assert_eq!(sample.len(), 2);
        assert_eq!(sample[0].symbol, "MSFT");
        assert_eq!(sample[1].symbol, "AAPL");
    }
}
