pub mod nasdaq;
pub mod util;
pub mod yahoo_finance;

pub use nasdaq::NasdaqDirectory;
pub use util::{RetryPolicy, with_retry};
pub use yahoo_finance::YahooFinanceProvider;
