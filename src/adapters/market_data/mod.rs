//! Market Data Adapters
//!
//! Offline price sources:
//! - `CsvPriceSource`: wide CSV price table (date column + one column per ticker)
//! - `SyntheticPair`: seeded cointegrated pair generator for smoke runs

mod csv_prices;
mod synthetic;

pub use csv_prices::{
    read_price_table, write_price_table, CsvPriceSource, DATE_FORMAT, DEFAULT_DATE_COLUMN,
};
pub use synthetic::SyntheticPair;
