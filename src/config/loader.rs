//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config/pairs.toml.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::strategy::params::{
    BacktestConfig, Confirmation, RegimeConfig, SignalConfig, SizingConfig, SizingMode,
    StrategyConfig, VolTargetConfig,
};

/// Environment override for `data.prices_csv`
pub const PRICES_CSV_ENV: &str = "PAIRS_PRICES_CSV";

/// Main configuration structure matching pairs.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub strategy: StrategySection,
    #[serde(default)]
    pub sizing: SizingSection,
    pub vol_target: Option<VolTargetConfig>,
    pub regime: Option<RegimeConfig>,
    #[serde(default)]
    pub backtest: BacktestSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Price input section
#[derive(Debug, Clone, Deserialize)]
pub struct DataSection {
    /// Wide price CSV (date column + one column per ticker)
    #[serde(default = "default_prices_csv")]
    pub prices_csv: String,
    /// Dependent leg
    pub y: Option<String>,
    /// Independent leg
    pub x: Option<String>,
    #[serde(default = "default_date_column")]
    pub date_column: String,
}

fn default_prices_csv() -> String {
    "data/prices.csv".to_string()
}

fn default_date_column() -> String {
    "date".to_string()
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            prices_csv: default_prices_csv(),
            y: None,
            x: None,
            date_column: default_date_column(),
        }
    }
}

impl DataSection {
    /// Price CSV path with environment override and `~` expansion.
    /// Checks PAIRS_PRICES_CSV first, falls back to the config value.
    pub fn get_prices_csv(&self) -> PathBuf {
        let raw = std::env::var(PRICES_CSV_ENV).unwrap_or_else(|_| self.prices_csv.clone());
        PathBuf::from(shellexpand::tilde(&raw).into_owned())
    }
}

/// Confirmation as written in TOML: an integer bar count or a float margin
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConfirmSetting {
    Bars(u32),
    Margin(f64),
}

/// Signal section
#[derive(Debug, Clone, Deserialize)]
pub struct StrategySection {
    /// Rolling window for the spread z-score (in bars)
    #[serde(default = "default_lookback")]
    pub lookback: usize,
    #[serde(default = "default_z_in")]
    pub z_in: f64,
    #[serde(default = "default_z_out")]
    pub z_out: f64,
    #[serde(default = "default_stop")]
    pub stop: f64,
    pub take_profit: Option<f64>,
    pub confirm: Option<ConfirmSetting>,
    /// Fixed hedge ratio; estimated from the data when absent
    pub hedge_ratio: Option<f64>,
}

fn default_lookback() -> usize {
    SignalConfig::default().lookback
}

fn default_z_in() -> f64 {
    SignalConfig::default().z_in
}

fn default_z_out() -> f64 {
    SignalConfig::default().z_out
}

fn default_stop() -> f64 {
    SignalConfig::default().stop
}

impl Default for StrategySection {
    fn default() -> Self {
        Self {
            lookback: default_lookback(),
            z_in: default_z_in(),
            z_out: default_z_out(),
            stop: default_stop(),
            take_profit: None,
            confirm: None,
            hedge_ratio: None,
        }
    }
}

/// Sizing section
#[derive(Debug, Clone, Deserialize)]
pub struct SizingSection {
    #[serde(default)]
    pub mode: SizingMode,
    #[serde(default = "default_cap")]
    pub cap: f64,
    #[serde(default = "default_unit_notional")]
    pub unit_notional: f64,
}

fn default_cap() -> f64 {
    SizingConfig::default().cap
}

fn default_unit_notional() -> f64 {
    SizingConfig::default().unit_notional
}

impl Default for SizingSection {
    fn default() -> Self {
        Self {
            mode: SizingMode::default(),
            cap: default_cap(),
            unit_notional: default_unit_notional(),
        }
    }
}

/// Backtest section
#[derive(Debug, Clone, Deserialize)]
pub struct BacktestSection {
    /// Cost per leg in basis points of traded notional
    #[serde(default = "default_cost_bps")]
    pub cost_bps: f64,
    #[serde(default = "default_starting_capital")]
    pub starting_capital: f64,
}

fn default_cost_bps() -> f64 {
    BacktestConfig::default().cost_bps
}

fn default_starting_capital() -> f64 {
    BacktestConfig::default().starting_capital
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            cost_bps: default_cost_bps(),
            starting_capital: default_starting_capital(),
        }
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {LEVELS:?}, got '{}'",
                self.logging.level
            )));
        }

        if let Some(ConfirmSetting::Margin(m)) = self.strategy.confirm {
            if !m.is_finite() || m < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "strategy.confirm margin must be >= 0, got {m}"
                )));
            }
        }

        StrategyConfig::from(self)
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

impl From<ConfirmSetting> for Confirmation {
    fn from(setting: ConfirmSetting) -> Self {
        match setting {
            ConfirmSetting::Bars(n) => Confirmation::Bars(n),
            ConfirmSetting::Margin(m) => Confirmation::Reversal(m),
        }
    }
}

// Conversion from Config to StrategyConfig
impl From<&Config> for StrategyConfig {
    fn from(config: &Config) -> Self {
        let s = &config.strategy;
        StrategyConfig {
            signal: SignalConfig {
                lookback: s.lookback,
                z_in: s.z_in,
                z_out: s.z_out,
                stop: s.stop,
                take_profit: s.take_profit,
                confirmation: s.confirm.map(Confirmation::from).unwrap_or_default(),
            },
            sizing: SizingConfig {
                mode: config.sizing.mode,
                cap: config.sizing.cap,
                unit_notional: config.sizing.unit_notional,
            },
            vol_target: config.vol_target.clone(),
            regime: config.regime.clone(),
            backtest: BacktestConfig {
                cost_bps: config.backtest.cost_bps,
                starting_capital: config.backtest.starting_capital,
            },
            hedge_ratio: s.hedge_ratio,
        }
    }
}
