//! CSV payloads and timestamped file names for user-facing downloads

use crate::core::{ScreenedTicker, TickerMetadata};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub const SCREENED_FILE_NAME: &str = "nasdaq_data.csv";

const TICKER_LIST_HEADERS: [&str; 4] = ["Symbol", "Name", "Market Category", "Exchange"];
const SCREENED_HEADERS: [&str; 7] = [
    "Symbol",
    "Name",
    "Market Category",
    "Exchange",
    "Last Sale",
    "Market Cap",
    "Volume",
];

/// The header row is written up front so an empty export still carries it.
fn to_csv<T: Serialize>(headers: &[&str], rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(headers)
        .context("Failed to write CSV header")?;
    for row in rows {
        writer.serialize(row).context("Failed to serialize CSV row")?;
    }
    writer.into_inner().context("Failed to flush CSV")
}

fn from_csv<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>> {
    csv::Reader::from_reader(bytes)
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .context("Failed to parse CSV")
}

/// `Symbol,Name,Market Category,Exchange`
pub fn ticker_list_csv(listings: &[TickerMetadata]) -> Result<Vec<u8>> {
    to_csv(&TICKER_LIST_HEADERS, listings)
}

/// `Symbol,Name,Market Category,Exchange,Last Sale,Market Cap,Volume`
pub fn screened_csv(rows: &[ScreenedTicker]) -> Result<Vec<u8>> {
    to_csv(&SCREENED_HEADERS, rows)
}

pub fn load_screened(bytes: &[u8]) -> Result<Vec<ScreenedTicker>> {
    from_csv(bytes)
}

pub fn ticker_list_file_name(now: NaiveDateTime) -> String {
    format!("nasdaq_tickers_{}.csv", now.format("%Y%m%d"))
}

pub fn archive_file_name(now: NaiveDateTime) -> String {
    format!("stock_data_{}.zip", now.format("%Y%m%d_%H%M%S"))
}
