//! Pair Runner
//!
//! Full pipeline for one pair: hedge ratio, spread, stats triple, signals,
//! sizing, backtest, trade P&L and metrics.

use serde::Serialize;

use crate::application::backtester::{BacktestResult, Backtester};
use crate::application::metrics::{PerformanceMetrics, TradeStats};
use crate::domain::error::{EngineError, EngineResult};
use crate::domain::position::PositionState;
use crate::domain::price::AlignedPair;
use crate::strategy::cointegration::{self, CointegrationStats};
use crate::strategy::params::{default_periods_per_year, ConfigError, StrategyConfig};
use crate::strategy::signal_generator::SignalGenerator;
use crate::strategy::sizing::{PositionSizer, SizingInputs};

/// Everything produced for one pair
#[derive(Debug, Clone, Serialize)]
pub struct PairReport {
    pub pair: String,
    pub y_ticker: String,
    pub x_ticker: String,
    pub stats: CointegrationStats,
    pub spread: Vec<f64>,
    pub z: Vec<Option<f64>>,
    pub states: Vec<PositionState>,
    pub multiplier: Vec<f64>,
    pub backtest: BacktestResult,
    pub metrics: PerformanceMetrics,
    pub trade_stats: TradeStats,
    pub config: StrategyConfig,
}

/// Runs one configuration against any number of pairs
#[derive(Debug)]
pub struct PairRunner {
    config: StrategyConfig,
    signals: SignalGenerator,
    sizer: PositionSizer,
    backtester: Backtester,
}

impl PairRunner {
    pub fn new(config: StrategyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            signals: SignalGenerator::new(config.signal.clone())?,
            sizer: PositionSizer::new(&config)?,
            backtester: Backtester::new(config.backtest.clone())?,
            config,
        })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn run(&self, pair: &AlignedPair) -> EngineResult<PairReport> {
        let label = pair.label();
        if pair.is_empty() {
            return Err(EngineError::EmptySeries {
                context: format!("pair {label}"),
            });
        }

        let beta = match self.config.hedge_ratio {
            Some(beta) => beta,
            None => cointegration::hedge_ratio(&pair.y, &pair.x)?,
        };
        let stats = CointegrationStats::with_hedge_ratio(&pair.y, &pair.x, beta)?;
        let spread = cointegration::spread(&pair.y, &pair.x, beta)?;

        tracing::info!(
            pair = %label,
            beta,
            adf_p = stats.stationarity.p_value,
            half_life = %stats.half_life,
            "pair stats"
        );

        let signals = self.signals.generate(&spread);
        let sized = self.sizer.size(&SizingInputs {
            states: &signals.states,
            z: &signals.z,
            spread: &spread,
            y: &pair.y,
            x: &pair.x,
            beta,
        })?;
        let backtest = self
            .backtester
            .run(pair, &sized, &signals.z, &signals.spans)?;

        let periods_per_year = self
            .config
            .vol_target
            .as_ref()
            .map_or_else(default_periods_per_year, |v| v.periods_per_year);
        let metrics = PerformanceMetrics::from_returns(&backtest.net_returns(), periods_per_year);
        let trade_stats = TradeStats::from_trades(&backtest.trades);

        Ok(PairReport {
            pair: label,
            y_ticker: pair.y_ticker.clone(),
            x_ticker: pair.x_ticker.clone(),
            stats,
            spread,
            z: signals.z,
            states: signals.states,
            multiplier: sized.multiplier,
            backtest,
            metrics,
            trade_stats,
            config: self.config.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::PriceSeries;
    use crate::strategy::params::SignalConfig;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn sine_pair(n: usize) -> AlignedPair {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let x: Vec<f64> = (0..n).map(|t| 100.0 + 0.05 * t as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(t, v)| 1.5 * v + 3.0 * (t as f64 * 0.3).sin() + rng.gen_range(-0.2..0.2))
            .collect();
        AlignedPair::new(
            &PriceSeries::daily("Y", start, &y).unwrap(),
            &PriceSeries::daily("X", start, &x).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_full_pipeline_shapes() {
        let config = StrategyConfig::default()
            .with_signal(SignalConfig::default().with_lookback(20).with_thresholds(1.2, 0.3, 3.0))
            .with_hedge_ratio(1.5);
        let runner = PairRunner::new(config).unwrap();
        let report = runner.run(&sine_pair(200)).unwrap();

        assert_eq!(report.pair, "Y/X");
        assert_eq!(report.stats.hedge_ratio, 1.5);
        assert_eq!(report.z.len(), 200);
        assert_eq!(report.states.len(), 200);
        assert_eq!(report.backtest.len(), 200);
        assert!(report.trade_stats.count > 0);
        assert!(report.stats.stationarity.is_stationary);
    }

    #[test]
    fn test_estimated_hedge_ratio_is_used() {
        let runner = PairRunner::new(StrategyConfig::default()).unwrap();
        let pair = sine_pair(150);
        let report = runner.run(&pair).unwrap();
        let beta = cointegration::hedge_ratio(&pair.y, &pair.x).unwrap();
        assert_eq!(report.stats.hedge_ratio, beta);
    }

    #[test]
    fn test_short_pair_is_insufficient() {
        let runner = PairRunner::new(StrategyConfig::default()).unwrap();
        let result = runner.run(&sine_pair(10));
        assert!(matches!(result, Err(EngineError::InsufficientData { .. })));
    }
}
