//! Butters Pairs - Cointegration Pairs-Trading Engine
//!
//! Research engine for two-leg statistical arbitrage on daily closes:
//! hedge ratio, ADF stationarity and half-life, a z-score state machine,
//! layered position sizing and a cost-aware backtester.
//!
//! # Modules
//!
//! - `domain`: Core data types (PriceSeries, AlignedPair, PositionState, TradeRecord)
//! - `ports`: Trait abstractions (PriceSource)
//! - `strategy`: Analytics and signal rules (cointegration, ADF, z-score, sizing)
//! - `application`: Backtester, pair pipeline, batch runner, metrics
//! - `adapters`: CSV prices, export, synthetic data, CLI
//! - `config`: Configuration loading and validation

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod strategy;

pub use application::{
    BacktestResult, Backtester, BatchRunner, PairReport, PairRunner, PerformanceMetrics,
};
pub use domain::{AlignedPair, EngineError, EngineResult, PositionState, PriceSeries, PriceTable};
pub use strategy::{CointegrationStats, PositionSizer, SignalGenerator, StrategyConfig};
