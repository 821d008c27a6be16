//! NASDAQ Trader symbol directory (`nasdaqlisted.txt` / `otherlisted.txt`)

use super::util::{RetryPolicy, with_retry};
use crate::core::{FetchError, SymbolDirectory, TickerMetadata};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

pub struct NasdaqDirectory {
    base_url: String,
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl NasdaqDirectory {
    pub fn new(base_url: &str, policy: RetryPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("stockfetch/0.1")
            .build()?;
        Ok(NasdaqDirectory {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            policy,
        })
    }

    async fn fetch_text(&self, file: &str) -> Result<String> {
        let url = format!("{}/{}", self.base_url, file);
        debug!("Requesting symbol directory from {}", url);

        with_retry(
            || async {
                let response = self
                    .client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| FetchError::provider(format!("Request error: {e}")))?;
                if !response.status().is_success() {
                    return Err(FetchError::provider(format!(
                        "HTTP error: {}",
                        response.status()
                    )));
                }
                response
                    .text()
                    .await
                    .map_err(|e| FetchError::provider(e.to_string()))
            },
            self.policy,
        )
        .await
        .with_context(|| format!("Failed to download {url}"))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NasdaqListedRow {
    #[serde(rename = "Symbol")]
    symbol: String,
    #[serde(rename = "Security Name")]
    security_name: String,
    #[serde(rename = "Market Category")]
    market_category: String,
    #[serde(rename = "Test Issue")]
    test_issue: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OtherListedRow {
    #[serde(rename = "ACT Symbol")]
    symbol: String,
    #[serde(rename = "Security Name")]
    security_name: String,
    #[serde(rename = "Test Issue")]
    test_issue: String,
}

fn parse_pipe_delimited<T: DeserializeOwned>(text: &str) -> Result<Vec<T>> {
    csv::ReaderBuilder::new()
        .delimiter(b'|')
        .flexible(true)
        .from_reader(text.as_bytes())
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .context("Failed to parse symbol directory")
}

/// Rows of `nasdaqlisted.txt` that are not test issues.
pub fn parse_nasdaq_listed(text: &str) -> Result<Vec<TickerMetadata>> {
    Ok(parse_pipe_delimited::<NasdaqListedRow>(text)?
        .into_iter()
        .filter(|row| row.test_issue == "N" && !row.symbol.is_empty())
        .map(|row| TickerMetadata {
            symbol: row.symbol,
            name: row.security_name,
            market_category: row.market_category,
            exchange: "NASDAQ".to_string(),
        })
        .collect())
}

/// Rows of `otherlisted.txt` that are not test issues.
pub fn parse_other_listed(text: &str) -> Result<Vec<TickerMetadata>> {
    Ok(parse_pipe_delimited::<OtherListedRow>(text)?
        .into_iter()
        .filter(|row| row.test_issue == "N" && !row.symbol.is_empty())
        .map(|row| TickerMetadata {
            symbol: row.symbol,
            name: row.security_name,
            market_category: "N/A".to_string(),
            exchange: "OTHER".to_string(),
        })
        .collect())
}

#[async_trait]
impl SymbolDirectory for NasdaqDirectory {
    #[instrument(name = "NasdaqDirectoryFetch", skip(self))]
    async fn fetch_listings(&self) -> Result<Vec<TickerMetadata>> {
        let nasdaq = parse_nasdaq_listed(&self.fetch_text("nasdaqlisted.txt").await?)?;
        let other = parse_other_listed(&self.fetch_text("otherlisted.txt").await?)?;
        debug!(nasdaq = nasdaq.len(), other = other.len(), "Parsed symbol directory");

        let mut listings = nasdaq;
        listings.extend(other);
        Ok(listings)
    }
}
