//! Price history abstractions and core types

use super::error::FetchError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Display;
use std::str::FromStr;

/// Relative history window understood by the provider's `range` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "8y")]
    EightYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "max")]
    Max,
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Period::FiveDays => "5d",
                Period::OneMonth => "1mo",
                Period::ThreeMonths => "3mo",
                Period::SixMonths => "6mo",
                Period::OneYear => "1y",
                Period::TwoYears => "2y",
                Period::FiveYears => "5y",
                Period::EightYears => "8y",
                Period::TenYears => "10y",
                Period::YearToDate => "ytd",
                Period::Max => "max",
            }
        )
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "5d" => Ok(Period::FiveDays),
            "1mo" => Ok(Period::OneMonth),
            "3mo" => Ok(Period::ThreeMonths),
            "6mo" => Ok(Period::SixMonths),
            "1y" => Ok(Period::OneYear),
            "2y" => Ok(Period::TwoYears),
            "5y" => Ok(Period::FiveYears),
            "8y" => Ok(Period::EightYears),
            "10y" => Ok(Period::TenYears),
            "ytd" => Ok(Period::YearToDate),
            "max" => Ok(Period::Max),
            _ => Err(anyhow::anyhow!("Invalid period: {}", s)),
        }
    }
}

/// Either a relative period or an explicit `[start, end)` date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    Period(Period),
    Between { start: NaiveDate, end: NaiveDate },
}

impl Display for RangeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RangeSpec::Period(p) => write!(f, "{p}"),
            RangeSpec::Between { start, end } => write!(f, "{start}..{end}"),
        }
    }
}

fn serialize_date<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&date.format("%Y-%m-%d"))
}

fn deserialize_date<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(d)?;
    let raw = raw.trim();
    // Timestamped exports carry a time part after the date
    let date_part = raw.get(..10).filter(|p| p.contains('-')).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .map_err(serde::de::Error::custom)
}

/// One trading day, with the canonical cache column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    #[serde(
        rename = "Date",
        alias = "date",
        serialize_with = "serialize_date",
        deserialize_with = "deserialize_date"
    )]
    pub date: NaiveDate,
    #[serde(rename = "Open", alias = "open")]
    pub open: f64,
    #[serde(rename = "High", alias = "high")]
    pub high: f64,
    #[serde(rename = "Low", alias = "low")]
    pub low: f64,
    #[serde(rename = "Close", alias = "close")]
    pub close: f64,
    #[serde(rename = "Volume", alias = "volume")]
    pub volume: u64,
}

/// Daily bars for one symbol, ascending by date with one bar per day.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub symbol: String,
    bars: Vec<DailyBar>,
}

impl PriceSeries {
    pub fn new(symbol: &str, mut bars: Vec<DailyBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        // Keep the last bar reported for a given day
        bars.reverse();
        bars.dedup_by_key(|b| b.date);
        bars.reverse();
        PriceSeries {
            symbol: symbol.to_uppercase(),
            bars,
        }
    }

    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    pub fn mean_volume(&self) -> Option<f64> {
        if self.bars.is_empty() {
            return None;
        }
        let total: f64 = self.bars.iter().map(|b| b.volume as f64).sum();
        Some(total / self.bars.len() as f64)
    }

    /// Serializes to the canonical `Date,Open,High,Low,Close,Volume` CSV form.
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for bar in &self.bars {
            writer
                .serialize(bar)
                .with_context(|| format!("Failed to serialize bar for {}", self.symbol))?;
        }
        writer
            .into_inner()
            .with_context(|| format!("Failed to flush CSV for {}", self.symbol))
    }

    /// Reads either column spelling (`Date`/`date`, `Open`/`open`, ...).
    pub fn from_csv<R: std::io::Read>(symbol: &str, reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let bars = reader
            .deserialize::<DailyBar>()
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to parse CSV for {symbol}"))?;
        Ok(PriceSeries::new(symbol, bars))
    }
}

/// Recent price and liquidity figures used for screening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSummary {
    pub symbol: String,
    pub name: Option<String>,
    pub last_price: f64,
    pub avg_volume: f64,
    pub market_cap: f64,
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Daily history for `symbol`. Pure fetch; persisting is the caller's job.
    async fn fetch_history(&self, symbol: &str, range: &RangeSpec)
    -> Result<PriceSeries, FetchError>;

    /// Last close and mean volume over the most recent 5 trading days, plus
    /// market cap and display name from a quote lookup.
    async fn fetch_summary(&self, symbol: &str) -> Result<TickerSummary, FetchError>;
}
