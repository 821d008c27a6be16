//! Core business logic abstractions

pub mod batch;
pub mod config;
pub mod error;
pub mod log;
pub mod pacing;
pub mod price;
pub mod screen;
pub mod session;
pub mod symbol;

// Re-export main types for cleaner imports
pub use batch::{BatchResult, collect_summaries, run_batch};
pub use error::FetchError;
pub use pacing::Pacer;
pub use price::{DailyBar, Period, PriceProvider, PriceSeries, RangeSpec, TickerSummary};
pub use screen::{ScreenedTicker, Thresholds, merge_and_filter};
pub use session::Session;
pub use symbol::{SymbolDirectory, TickerMetadata, parse_symbol_list};
