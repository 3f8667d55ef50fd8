//! Strategy Parameters
//!
//! Configuration structs for the signal generator, position sizer and
//! backtester. Every struct validates itself; the engine constructors call
//! `validate()` so an invalid combination fails before any computation.

use serde::{Deserialize, Serialize};

/// Entry confirmation policy
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    /// Enter on the bar the threshold is crossed
    #[default]
    None,
    /// Entry condition must hold for this many consecutive bars (0 and 1 are immediate)
    Bars(u32),
    /// After the cross, z must retreat toward 0 by at least this much from
    /// its extreme while still beyond the entry threshold
    Reversal(f64),
}

/// Z-score signal configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Rolling window for the spread mean and std
    pub lookback: usize,
    /// Entry threshold on |z|
    pub z_in: f64,
    /// Normal exit threshold on |z|
    pub z_out: f64,
    /// Stop-loss threshold on |z|
    pub stop: f64,
    /// Exit once z has crossed through 0 by this margin
    #[serde(default)]
    pub take_profit: Option<f64>,
    #[serde(default)]
    pub confirmation: Confirmation,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            lookback: 60,
            z_in: 2.0,
            z_out: 0.5,
            stop: 3.5,
            take_profit: None,
            confirmation: Confirmation::None,
        }
    }
}

impl SignalConfig {
    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn with_thresholds(mut self, z_in: f64, z_out: f64, stop: f64) -> Self {
        self.z_in = z_in;
        self.z_out = z_out;
        self.stop = stop;
        self
    }

    pub fn with_take_profit(mut self, take_profit: f64) -> Self {
        self.take_profit = Some(take_profit);
        self
    }

    pub fn with_confirmation(mut self, confirmation: Confirmation) -> Self {
        self.confirmation = confirmation;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lookback <= 1 {
            return Err(ConfigError::InvalidLookback(self.lookback));
        }
        for (name, value) in [("z_in", self.z_in), ("z_out", self.z_out), ("stop", self.stop)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        if !(self.z_out < self.z_in && self.z_in < self.stop) {
            return Err(ConfigError::ThresholdOrder {
                z_out: self.z_out,
                z_in: self.z_in,
                stop: self.stop,
            });
        }
        if let Some(tp) = self.take_profit {
            if !tp.is_finite() || tp < 0.0 {
                return Err(ConfigError::InvalidTakeProfit(tp));
            }
        }
        if let Confirmation::Reversal(delta) = self.confirmation {
            if !delta.is_finite() || delta < 0.0 {
                return Err(ConfigError::InvalidConfirmation(format!(
                    "reversal margin must be finite and >= 0, got {delta}"
                )));
            }
        }
        Ok(())
    }
}

/// How the base ±1 signal is scaled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMode {
    /// Full unit size whenever in a position
    #[default]
    Static,
    /// Size grows with |z| / z_in, capped
    Dynamic,
}

/// Position sizing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingConfig {
    #[serde(default)]
    pub mode: SizingMode,
    /// Maximum absolute size multiplier
    pub cap: f64,
    /// Y-leg weight (fraction of equity) of one unit of signal
    pub unit_notional: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            mode: SizingMode::Static,
            cap: 2.0,
            unit_notional: 1.0,
        }
    }
}

impl SizingConfig {
    pub fn dynamic(cap: f64) -> Self {
        Self {
            mode: SizingMode::Dynamic,
            cap,
            ..Default::default()
        }
    }

    pub fn with_unit_notional(mut self, unit_notional: f64) -> Self {
        self.unit_notional = unit_notional;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.cap.is_finite() || self.cap < 1.0 {
            return Err(ConfigError::InvalidCap(self.cap));
        }
        if !self.unit_notional.is_finite() || self.unit_notional <= 0.0 {
            return Err(ConfigError::InvalidNotional(self.unit_notional));
        }
        Ok(())
    }
}

/// Volatility targeting layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolTargetConfig {
    /// Annualized volatility target (0.10 = 10%)
    pub target: f64,
    /// Trailing window of strategy returns
    #[serde(default = "default_vol_window")]
    pub window: usize,
    /// Realized vol floor, guards the division
    #[serde(default = "default_vol_floor")]
    pub floor: f64,
    /// Largest allowed scale factor
    #[serde(default = "default_max_scale")]
    pub max_scale: f64,
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,
}

fn default_vol_window() -> usize {
    63
}

fn default_vol_floor() -> f64 {
    0.01
}

fn default_max_scale() -> f64 {
    3.0
}

pub(crate) fn default_periods_per_year() -> f64 {
    252.0
}

impl VolTargetConfig {
    pub fn new(target: f64) -> Self {
        Self {
            target,
            window: default_vol_window(),
            floor: default_vol_floor(),
            max_scale: default_max_scale(),
            periods_per_year: default_periods_per_year(),
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.target.is_finite() || self.target <= 0.0 {
            return Err(ConfigError::InvalidVolTarget(format!(
                "target must be > 0, got {}",
                self.target
            )));
        }
        if self.window < 2 {
            return Err(ConfigError::InvalidVolTarget(format!(
                "window must be >= 2, got {}",
                self.window
            )));
        }
        if !self.floor.is_finite() || self.floor <= 0.0 {
            return Err(ConfigError::InvalidVolTarget(format!(
                "floor must be > 0, got {}",
                self.floor
            )));
        }
        if !self.max_scale.is_finite() || self.max_scale <= 0.0 {
            return Err(ConfigError::InvalidVolTarget(format!(
                "max_scale must be > 0, got {}",
                self.max_scale
            )));
        }
        if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
            return Err(ConfigError::InvalidVolTarget(format!(
                "periods_per_year must be > 0, got {}",
                self.periods_per_year
            )));
        }
        Ok(())
    }
}

/// Regime filter: disables trading when the trailing spread stops looking mean-reverting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeConfig {
    /// Trailing window for the rolling re-estimate
    #[serde(default = "default_regime_window")]
    pub window: usize,
    /// Maximum ADF p-value allowed
    #[serde(default)]
    pub pmax: Option<f64>,
    /// Half-life band in bars
    #[serde(default)]
    pub halflife_min: Option<f64>,
    #[serde(default)]
    pub halflife_max: Option<f64>,
}

fn default_regime_window() -> usize {
    126
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            window: default_regime_window(),
            pmax: Some(0.05),
            halflife_min: None,
            halflife_max: None,
        }
    }
}

impl RegimeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window < crate::strategy::adf::MIN_ADF_OBSERVATIONS {
            return Err(ConfigError::InvalidRegime(format!(
                "window must be >= {}, got {}",
                crate::strategy::adf::MIN_ADF_OBSERVATIONS,
                self.window
            )));
        }
        if self.pmax.is_none() && self.halflife_min.is_none() && self.halflife_max.is_none() {
            return Err(ConfigError::InvalidRegime(
                "at least one of pmax, halflife_min, halflife_max must be set".to_string(),
            ));
        }
        if let Some(p) = self.pmax {
            if !(p > 0.0 && p <= 1.0) {
                return Err(ConfigError::InvalidRegime(format!(
                    "pmax must be in (0, 1], got {p}"
                )));
            }
        }
        let bounds = [
            ("halflife_min", self.halflife_min),
            ("halflife_max", self.halflife_max),
        ];
        for (name, bound) in bounds {
            if let Some(v) = bound {
                if !v.is_finite() || v < 0.0 {
                    return Err(ConfigError::InvalidRegime(format!(
                        "{name} must be finite and >= 0, got {v}"
                    )));
                }
            }
        }
        if let (Some(lo), Some(hi)) = (self.halflife_min, self.halflife_max) {
            if lo >= hi {
                return Err(ConfigError::InvalidRegime(format!(
                    "halflife_min ({lo}) must be below halflife_max ({hi})"
                )));
            }
        }
        Ok(())
    }
}

/// Cost and capital settings for the backtester
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Cost per leg in basis points of traded notional
    pub cost_bps: f64,
    pub starting_capital: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            cost_bps: 1.0,
            starting_capital: 100_000.0,
        }
    }
}

impl BacktestConfig {
    pub fn with_cost_bps(mut self, cost_bps: f64) -> Self {
        self.cost_bps = cost_bps;
        self
    }

    pub fn with_capital(mut self, capital: f64) -> Self {
        self.starting_capital = capital;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.cost_bps.is_finite() || self.cost_bps < 0.0 {
            return Err(ConfigError::InvalidCost(self.cost_bps));
        }
        if !self.starting_capital.is_finite() || self.starting_capital <= 0.0 {
            return Err(ConfigError::InvalidCapital(self.starting_capital));
        }
        Ok(())
    }
}

/// Main strategy configuration for one pair run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub signal: SignalConfig,
    pub sizing: SizingConfig,
    pub vol_target: Option<VolTargetConfig>,
    pub regime: Option<RegimeConfig>,
    pub backtest: BacktestConfig,
    /// Use this hedge ratio instead of estimating it from the sample
    pub hedge_ratio: Option<f64>,
}

impl StrategyConfig {
    pub fn with_signal(mut self, signal: SignalConfig) -> Self {
        self.signal = signal;
        self
    }

    pub fn with_sizing(mut self, sizing: SizingConfig) -> Self {
        self.sizing = sizing;
        self
    }

    pub fn with_vol_target(mut self, vol_target: VolTargetConfig) -> Self {
        self.vol_target = Some(vol_target);
        self
    }

    pub fn with_regime(mut self, regime: RegimeConfig) -> Self {
        self.regime = Some(regime);
        self
    }

    pub fn with_backtest(mut self, backtest: BacktestConfig) -> Self {
        self.backtest = backtest;
        self
    }

    pub fn with_hedge_ratio(mut self, beta: f64) -> Self {
        self.hedge_ratio = Some(beta);
        self
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.signal.validate()?;
        self.sizing.validate()?;
        if let Some(vt) = &self.vol_target {
            vt.validate()?;
        }
        if let Some(regime) = &self.regime {
            regime.validate()?;
        }
        self.backtest.validate()?;
        if let Some(beta) = self.hedge_ratio {
            if !beta.is_finite() || beta == 0.0 {
                return Err(ConfigError::InvalidHedgeRatio(beta));
            }
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid lookback: {0} (must be > 1)")]
    InvalidLookback(usize),
    #[error("Invalid {name}: {value} (must be finite and > 0)")]
    InvalidThreshold { name: &'static str, value: f64 },
    #[error("Invalid thresholds: need 0 < z_out ({z_out}) < z_in ({z_in}) < stop ({stop})")]
    ThresholdOrder { z_out: f64, z_in: f64, stop: f64 },
    #[error("Invalid take profit: {0} (must be >= 0)")]
    InvalidTakeProfit(f64),
    #[error("Invalid confirmation: {0}")]
    InvalidConfirmation(String),
    #[error("Invalid size cap: {0} (must be >= 1)")]
    InvalidCap(f64),
    #[error("Invalid unit notional: {0} (must be > 0)")]
    InvalidNotional(f64),
    #[error("Invalid vol target: {0}")]
    InvalidVolTarget(String),
    #[error("Invalid regime filter: {0}")]
    InvalidRegime(String),
    #[error("Invalid cost: {0} bps (must be >= 0)")]
    InvalidCost(f64),
    #[error("Invalid starting capital: {0} (must be > 0)")]
    InvalidCapital(f64),
    #[error("Invalid hedge ratio: {0} (must be finite and nonzero)")]
    InvalidHedgeRatio(f64),
}
