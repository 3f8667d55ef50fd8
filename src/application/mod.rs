//! Application Layer - Backtests and pipelines
//!
//! Wires the strategy components into the per-pair pipeline and runs
//! batches of independent pair/configuration jobs.

pub mod backtester;
pub mod batch;
pub mod metrics;
pub mod pair_runner;

pub use backtester::{BacktestResult, BacktestRow, Backtester, Leg, PriceFlag};
pub use batch::{BatchFailure, BatchJob, BatchReport, BatchRunner};
pub use metrics::{PerformanceMetrics, TradeStats};
pub use pair_runner::{PairReport, PairRunner};
