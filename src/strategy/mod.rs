//! Strategy Layer - Pairs Analytics and Signal Rules
//!
//! Pure functions of the price history:
//! - Cointegration stats: hedge ratio, spread, ADF stationarity, half-life
//! - Rolling z-score over a configurable lookback
//! - Z-score state machine with stop, take-profit and confirmation rules
//! - Position sizing as an ordered pipeline of layers (dynamic scaling,
//!   regime gate, volatility targeting, cap)

pub mod adf;
pub mod cointegration;
pub mod params;
pub mod regime;
pub mod signal_generator;
pub mod sizing;
pub mod zscore_gate;

pub use adf::{AdfLag, AdfTest, CriticalValues, StationarityResult};
pub use cointegration::{
    half_life, hedge_ratio, spread, stationarity_test, CointegrationStats, HalfLife,
};
pub use params::{
    BacktestConfig, ConfigError, Confirmation, RegimeConfig, SignalConfig, SizingConfig,
    SizingMode, StrategyConfig, VolTargetConfig,
};
pub use regime::{RegimeFilter, RegimeStatus};
pub use signal_generator::{SignalGenerator, SignalOutput};
pub use sizing::{
    CapClamp, DynamicScaling, PositionSizer, RegimeGate, SizeLayer, SizedPositions, SizingInputs,
    VolTarget,
};
pub use zscore_gate::{rolling_zscore, ZScoreGate, ZScoreResult};
