//! Pairs Engine Integration Tests
//!
//! End-to-end checks across the public API:
//! 1. Cointegration stats on constructed series with known answers
//! 2. Z-score window locality and state machine precedence
//! 3. Backtest causality and cost behaviour
//! 4. Sine-wave round trip through the full pipeline
//! 5. CSV -> batch runner with per-job failures
//!
//! All tests are deterministic (seeded noise, no network).

use approx::assert_relative_eq;
use butters_pairs::adapters::market_data::{write_price_table, CsvPriceSource, SyntheticPair};
use butters_pairs::application::{BatchJob, BatchRunner, Backtester, PairRunner};
use butters_pairs::config::load_config;
use butters_pairs::domain::{AlignedPair, EngineError, ExitReason, PositionState, PriceSeries};
use butters_pairs::strategy::{
    half_life, hedge_ratio, rolling_zscore, BacktestConfig, HalfLife, PositionSizer, SignalConfig,
    SignalGenerator, SizedPositions, SizingInputs, StrategyConfig,
};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;

// ============================================================================
// Test Fixtures
// ============================================================================

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 3).unwrap()
}

/// Flat X at 100, Y = 150 + amplitude·sin(2πt/period) + small seeded noise
fn sine_pair(n: usize, period: f64, amplitude: f64) -> AlignedPair {
    let mut rng = StdRng::seed_from_u64(2024);
    let x = vec![100.0; n];
    let y: Vec<f64> = (0..n)
        .map(|t| {
            let phase = 2.0 * std::f64::consts::PI * t as f64 / period;
            150.0 + amplitude * phase.sin() + rng.gen_range(-0.05..0.05)
        })
        .collect();
    AlignedPair::new(
        &PriceSeries::daily("Y", start(), &y).unwrap(),
        &PriceSeries::daily("X", start(), &x).unwrap(),
    )
    .unwrap()
}

fn sine_config(cost_bps: f64) -> StrategyConfig {
    StrategyConfig::default()
        .with_signal(SignalConfig::default().with_lookback(40).with_thresholds(1.0, 0.25, 3.0))
        .with_backtest(BacktestConfig::default().with_cost_bps(cost_bps))
}

// ============================================================================
// Cointegration Stats
// ============================================================================

#[test]
fn test_hedge_ratio_exact_multiple() {
    let x: Vec<f64> = (1..=50).map(|v| v as f64).collect();
    let y: Vec<f64> = x.iter().map(|v| 2.0 * v).collect();
    assert_relative_eq!(hedge_ratio(&y, &x).unwrap(), 2.0, epsilon = 1e-12);
}

#[test]
fn test_half_life_of_known_decay() {
    // S_t = 0.9·S_{t-1}, so ΔS_t = -0.1·S_{t-1}
    let spread: Vec<f64> = (0..60).map(|t| 100.0 * 0.9_f64.powi(t)).collect();
    let expected = -std::f64::consts::LN_2 / 0.9_f64.ln();

    match half_life(&spread).unwrap() {
        HalfLife::Bars { bars } => assert_relative_eq!(bars, expected, max_relative = 1e-8),
        other => panic!("expected a half-life, got {other}"),
    }
}

#[test]
fn test_explosive_spread_is_not_mean_reverting() {
    let spread: Vec<f64> = (0..40).map(|t| 1.05_f64.powi(t)).collect();
    let hl = half_life(&spread).unwrap();
    assert!(!hl.is_mean_reverting());
    assert!(hl.bars().is_none());
}

// ============================================================================
// Signals
// ============================================================================

#[test]
fn test_zscore_outlier_after_constant_window() {
    let lookback = 5;
    let mut series = vec![10.0; lookback];
    series.push(13.0);

    let z = rolling_zscore(&series, lookback);
    assert!(z[..lookback - 1].iter().all(Option::is_none));
    // Constant window has no dispersion
    assert!(z[lookback - 1].is_none());

    let l = lookback as f64;
    assert_relative_eq!(z[lookback].unwrap(), (l - 1.0) / l.sqrt(), epsilon = 1e-12);
}

#[test]
fn test_stop_wins_over_take_profit_on_same_bar() {
    let generator = SignalGenerator::new(
        SignalConfig::default()
            .with_thresholds(2.0, 0.5, 3.5)
            .with_take_profit(0.5),
    )
    .unwrap();

    // Long entered at -2.5, next bar +4.0 satisfies both stop and take-profit
    let (states, spans) = generator.run_states(&[None, Some(-2.5), Some(4.0), Some(0.0)]);

    assert_eq!(
        states,
        vec![
            PositionState::Flat,
            PositionState::LongSpread,
            PositionState::Flat,
            PositionState::Flat
        ]
    );
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].exit_reason, ExitReason::Stop);
    assert_eq!(spans[0].exit_index, 2);
}

#[test]
fn test_invalid_threshold_order_fails_at_construction() {
    let result = SignalGenerator::new(SignalConfig::default().with_thresholds(2.0, 0.5, 1.8));
    assert!(result.is_err());

    let err = PairRunner::new(
        StrategyConfig::default().with_signal(SignalConfig::default().with_lookback(0)),
    )
    .unwrap_err();
    assert!(EngineError::from(err).is_configuration());
}

// ============================================================================
// Backtest
// ============================================================================

#[test]
fn test_no_return_accrues_from_flat_prior_bar() {
    let pair = sine_pair(300, 40.0, 3.0);
    let report = PairRunner::new(sine_config(2.0)).unwrap().run(&pair).unwrap();
    let rows = &report.backtest.rows;

    assert_eq!(rows[0].daily_return, 0.0);
    for t in 1..rows.len() {
        if rows[t - 1].position_y == 0.0 && rows[t - 1].position_x == 0.0 {
            assert_eq!(rows[t].daily_return, 0.0, "bar {t}");
        }
    }
}

#[test]
fn test_higher_cost_never_increases_pnl() {
    let pair = sine_pair(300, 40.0, 3.0);
    let config = sine_config(0.0);

    let beta = hedge_ratio(&pair.y, &pair.x).unwrap();
    let spread: Vec<f64> = pair.y.iter().zip(&pair.x).map(|(y, x)| y - beta * x).collect();
    let signals = SignalGenerator::new(config.signal.clone()).unwrap().generate(&spread);
    let sized = PositionSizer::new(&config)
        .unwrap()
        .size(&SizingInputs {
            states: &signals.states,
            z: &signals.z,
            spread: &spread,
            y: &pair.y,
            x: &pair.x,
            beta,
        })
        .unwrap();

    let mut last = f64::INFINITY;
    for bps in [0.0, 1.0, 2.0, 5.0, 25.0] {
        let bt = Backtester::new(BacktestConfig::default().with_cost_bps(bps))
            .unwrap()
            .run(&pair, &sized, &signals.z, &signals.spans)
            .unwrap();
        let pnl = bt.cumulative_pnl();
        assert!(pnl <= last, "pnl at {bps} bps = {pnl} > {last}");
        last = pnl;
    }
}

#[test]
fn test_sine_spread_round_trip() {
    let pair = sine_pair(400, 40.0, 3.0);
    let report = PairRunner::new(sine_config(2.0)).unwrap().run(&pair).unwrap();
    let bt = &report.backtest;

    let long_round_trip = bt.trades.iter().any(|t| {
        t.entry_state == PositionState::LongSpread && t.exit_reason == ExitReason::Target
    });
    assert!(long_round_trip, "trades: {:?}", bt.trades);

    assert!(bt.total_turnover() > 0.0);
    assert!(bt.total_cost() > 0.0);
    assert!(
        bt.total_cost() < bt.gross_pnl().abs(),
        "cost {} vs gross {}",
        bt.total_cost(),
        bt.gross_pnl()
    );
    assert!(bt.gross_pnl() > 0.0);
    assert!(bt.flags.is_empty());

    assert_eq!(report.z.len(), pair.len());
    assert_eq!(report.states.len(), pair.len());
    assert!(report.stats.stationarity.is_stationary);
    assert!(report.stats.half_life.is_mean_reverting());
    assert_eq!(report.trade_stats.count, bt.trades.len());
}

#[test]
fn test_zero_prior_price_is_flagged() {
    let x = [50.0, 50.0, 0.0, 50.0, 51.0];
    let y = [100.0, 101.0, 102.0, 101.0, 100.0];
    let pair = AlignedPair::new(
        &PriceSeries::daily("Y", start(), &y).unwrap(),
        &PriceSeries::daily("X", start(), &x).unwrap(),
    )
    .unwrap();
    let sized = SizedPositions::from_multipliers(vec![1.0; 5], 2.0, 1.0);
    let no_z: Vec<Option<f64>> = vec![None; 5];

    let bt = Backtester::new(BacktestConfig::default().with_cost_bps(0.0))
        .unwrap()
        .run(&pair, &sized, &no_z, &[])
        .unwrap();

    assert_eq!(bt.flags.len(), 1);
    assert_eq!(bt.flags[0].date, pair.dates[3]);
    // Y leg still earns its return on the flagged bar
    assert_relative_eq!(bt.rows[3].daily_return, 101.0 / 102.0 - 1.0, epsilon = 1e-12);
}

// ============================================================================
// Data edge and batch
// ============================================================================

#[test]
fn test_csv_batch_collects_failures() {
    let table = SyntheticPair::default().with_days(400).generate().unwrap();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write_price_table(&mut file, &table).unwrap();
    file.flush().unwrap();

    let source = CsvPriceSource::open(file.path(), "date").unwrap();
    let config = StrategyConfig::default()
        .with_signal(SignalConfig::default().with_lookback(30));

    let report = BatchRunner::new(vec![
        BatchJob::new("SYN_Y", "SYN_X", config.clone()),
        BatchJob::new("SYN_Y", "NOPE", config.clone()),
        BatchJob::new("SYN_X", "SYN_Y", config),
    ])
    .unwrap()
    .run(&source);

    assert_eq!(report.successes.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].x, "NOPE");
    assert!(report.successes[0].stats.stationarity.is_stationary);
}

#[test]
fn test_sample_config_is_valid() {
    let config = load_config("config/pairs.toml").unwrap();
    let strategy = StrategyConfig::from(&config);
    assert!(strategy.validate().is_ok());
    assert!(PairRunner::new(strategy).is_ok());
}
