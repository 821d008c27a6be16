//! On-disk cache, archive packaging and CSV exports

pub mod archive;
pub mod disk;
pub mod export;

pub use archive::{build_archive, series_entries};
pub use disk::CsvCache;
