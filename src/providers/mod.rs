pub mod util;
pub mod yahoo_finance;

pub use yahoo_finance::YahooSeriesProvider;
