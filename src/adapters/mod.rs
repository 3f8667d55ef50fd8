//! Adapters Layer - External System Implementations
//!
//! - Market Data: CSV price tables and the synthetic pair generator
//! - Export: backtest tables, trades and reports to CSV/JSON
//! - CLI: Command-line interface handlers

pub mod cli;
pub mod export;
pub mod market_data;

pub use cli::CliApp;
pub use market_data::{CsvPriceSource, SyntheticPair};
