//! CLI Command Handlers
//!
//! Implementation of all CLI commands for the pairs engine.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::adapters::export;
use crate::adapters::market_data::{write_price_table, CsvPriceSource, SyntheticPair};
use crate::application::{BatchJob, BatchReport, BatchRunner, PairReport, PairRunner};
use crate::config::loader::DataSection;
use crate::config::{load_config, Config};
use crate::ports::PriceSource;
use crate::strategy::{CointegrationStats, StrategyConfig};

/// Butters Pairs - cointegration pairs-trading research engine
#[derive(Parser, Debug)]
#[command(
    name = "butters-pairs",
    version = env!("CARGO_PKG_VERSION"),
    about = "Cointegration pairs-trading signals and backtests",
    long_about = "Estimates hedge ratio, ADF stationarity and half-life for a pair of \
                  price series, runs the z-score state machine and backtests the sized \
                  positions with per-leg transaction costs."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print hedge ratio, ADF result and half-life for a pair
    Stats(StatsCmd),

    /// Backtest one pair
    Backtest(BacktestCmd),

    /// Backtest many pairs over a parameter grid
    Sweep(SweepCmd),

    /// Write a synthetic cointegrated pair to CSV
    Simulate(SimulateCmd),
}

impl Command {
    /// Config file the command reads, if any
    pub fn config_path(&self) -> Option<&Path> {
        match self {
            Command::Stats(cmd) => Some(&cmd.config),
            Command::Backtest(cmd) => Some(&cmd.config),
            Command::Sweep(cmd) => Some(&cmd.config),
            Command::Simulate(_) => None,
        }
    }
}

/// Pair statistics
#[derive(Parser, Debug)]
pub struct StatsCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/pairs.toml")]
    pub config: PathBuf,

    /// Dependent leg (overrides data.y)
    #[arg(long, value_name = "TICKER")]
    pub y: Option<String>,

    /// Independent leg (overrides data.x)
    #[arg(long, value_name = "TICKER")]
    pub x: Option<String>,
}

/// Single pair backtest
#[derive(Parser, Debug)]
pub struct BacktestCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/pairs.toml")]
    pub config: PathBuf,

    /// Dependent leg (overrides data.y)
    #[arg(long, value_name = "TICKER")]
    pub y: Option<String>,

    /// Independent leg (overrides data.x)
    #[arg(long, value_name = "TICKER")]
    pub x: Option<String>,

    /// Override starting capital
    #[arg(long, value_name = "AMOUNT")]
    pub capital: Option<f64>,

    /// Override cost per leg in basis points
    #[arg(long, value_name = "BPS")]
    pub cost_bps: Option<f64>,

    /// Export the per-date backtest table to CSV
    #[arg(long, value_name = "FILE")]
    pub export_csv: Option<PathBuf>,

    /// Export closed trades to CSV
    #[arg(long, value_name = "FILE")]
    pub export_trades: Option<PathBuf>,

    /// Export the full pair report to JSON
    #[arg(long, value_name = "FILE")]
    pub export_json: Option<PathBuf>,
}

/// Batch over pairs and a parameter grid
#[derive(Parser, Debug)]
pub struct SweepCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/pairs.toml")]
    pub config: PathBuf,

    /// Pairs as Y:X, comma separated
    #[arg(
        long,
        value_name = "Y:X",
        value_delimiter = ',',
        required = true,
        value_parser = parse_pair
    )]
    pub pairs: Vec<PairArg>,

    /// Entry thresholds to try (defaults to strategy.z_in)
    #[arg(long, value_name = "Z", value_delimiter = ',')]
    pub z_in: Vec<f64>,

    /// Lookbacks to try (defaults to strategy.lookback)
    #[arg(long, value_name = "BARS", value_delimiter = ',')]
    pub lookback: Vec<usize>,

    /// Run jobs one after another
    #[arg(long)]
    pub sequential: bool,

    /// Export the batch report to JSON
    #[arg(long, value_name = "FILE")]
    pub export_json: Option<PathBuf>,
}

/// Synthetic data generation
#[derive(Parser, Debug)]
pub struct SimulateCmd {
    /// Output CSV path
    #[arg(short, long, value_name = "FILE")]
    pub out: PathBuf,

    /// Number of daily bars
    #[arg(long, value_name = "DAYS", default_value = "756")]
    pub days: usize,

    /// Hedge ratio of Y on X
    #[arg(long, value_name = "BETA", default_value = "1.5")]
    pub beta: f64,

    /// AR(1) coefficient of the spread
    #[arg(long, value_name = "PHI", default_value = "0.9")]
    pub phi: f64,

    /// RNG seed
    #[arg(long, value_name = "SEED", default_value = "7")]
    pub seed: u64,
}

/// A `Y:X` pair argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairArg {
    pub y: String,
    pub x: String,
}

fn parse_pair(raw: &str) -> std::result::Result<PairArg, String> {
    match raw.trim().split_once(':') {
        Some((y, x)) if !y.trim().is_empty() && !x.trim().is_empty() => Ok(PairArg {
            y: y.trim().to_string(),
            x: x.trim().to_string(),
        }),
        _ => Err(format!("expected Y:X, got '{raw}'")),
    }
}

/// Execute the CLI command
pub fn execute(app: CliApp) -> Result<()> {
    let config = match app.command.config_path() {
        Some(path) => Some(
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        ),
        None => None,
    };
    init_logging(
        app.verbose,
        app.debug,
        config.as_ref().map(|c| c.logging.level.as_str()),
    )?;

    match (app.command, config) {
        (Command::Stats(cmd), Some(config)) => stats_command(cmd, &config),
        (Command::Backtest(cmd), Some(config)) => backtest_command(cmd, &config),
        (Command::Sweep(cmd), Some(config)) => sweep_command(cmd, &config),
        (Command::Simulate(cmd), _) => simulate_command(cmd),
        (_, None) => bail!("configuration file required"),
    }
}

/// Initialize logging system. Flags win over the config level; RUST_LOG wins over both.
fn init_logging(verbose: bool, debug: bool, config_level: Option<&str>) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        config_level.unwrap_or("warn")
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {e}"))
}

fn resolve_legs(
    y: Option<String>,
    x: Option<String>,
    data: &DataSection,
) -> Result<(String, String)> {
    let y = y
        .or_else(|| data.y.clone())
        .context("No dependent leg: pass --y or set data.y")?;
    let x = x
        .or_else(|| data.x.clone())
        .context("No independent leg: pass --x or set data.x")?;
    Ok((y, x))
}

fn open_prices(config: &Config) -> Result<CsvPriceSource> {
    let path = config.data.get_prices_csv();
    CsvPriceSource::open(&path, &config.data.date_column)
        .with_context(|| format!("Failed to load prices from {}", path.display()))
}

/// Handle stats command
fn stats_command(cmd: StatsCmd, config: &Config) -> Result<()> {
    let (y, x) = resolve_legs(cmd.y, cmd.x, &config.data)?;
    let prices = open_prices(config)?;
    let pair = prices.pair(&y, &x)?;

    let stats = match config.strategy.hedge_ratio {
        Some(beta) => CointegrationStats::with_hedge_ratio(&pair.y, &pair.x, beta)?,
        None => CointegrationStats::estimate(&pair.y, &pair.x)?,
    };
    let adf = &stats.stationarity;

    println!("Pair: {} ({} aligned bars)", pair.label(), pair.len());
    println!("  Hedge ratio:    {:.6}", stats.hedge_ratio);
    println!(
        "  ADF statistic:  {:.4} (lag {}, nobs {})",
        adf.test_statistic, adf.used_lag, adf.nobs
    );
    println!(
        "  Critical:       1% {:.3}  5% {:.3}  10% {:.3}",
        adf.critical_values.one_pct, adf.critical_values.five_pct, adf.critical_values.ten_pct
    );
    println!(
        "  p-value:        {:.4} ({})",
        adf.p_value,
        if adf.is_stationary { "stationary" } else { "not stationary" }
    );
    println!("  Half-life:      {}", stats.half_life);

    Ok(())
}

/// Handle backtest command
fn backtest_command(cmd: BacktestCmd, config: &Config) -> Result<()> {
    let (y, x) = resolve_legs(cmd.y, cmd.x, &config.data)?;

    let mut strategy = StrategyConfig::from(config);
    if let Some(capital) = cmd.capital {
        strategy.backtest.starting_capital = capital;
    }
    if let Some(bps) = cmd.cost_bps {
        strategy.backtest.cost_bps = bps;
    }
    let runner = PairRunner::new(strategy).context("Invalid strategy configuration")?;

    let prices = open_prices(config)?;
    let pair = prices.pair(&y, &x)?;
    tracing::info!(pair = %pair.label(), bars = pair.len(), "starting backtest");

    let report = runner.run(&pair)?;
    print_report(&report);

    if let Some(ref path) = cmd.export_csv {
        export::export_backtest_csv(path, &report.backtest)
            .with_context(|| format!("Failed to export CSV to {}", path.display()))?;
        println!("  Exported table:  {}", path.display());
    }
    if let Some(ref path) = cmd.export_trades {
        export::export_trades_csv(path, &report.backtest.trades)
            .with_context(|| format!("Failed to export trades to {}", path.display()))?;
        println!("  Exported trades: {}", path.display());
    }
    if let Some(ref path) = cmd.export_json {
        export::export_json(path, &report)
            .with_context(|| format!("Failed to export JSON to {}", path.display()))?;
        println!("  Exported report: {}", path.display());
    }

    Ok(())
}

fn print_report(report: &PairReport) {
    let bt = &report.backtest;
    let m = &report.metrics;
    let t = &report.trade_stats;

    println!("Backtest: {}", report.pair);
    println!("  Hedge ratio:     {:.6}", report.stats.hedge_ratio);
    println!("  ADF p-value:     {:.4}", report.stats.stationarity.p_value);
    println!("  Half-life:       {}", report.stats.half_life);
    println!("  Bars:            {}", bt.len());
    println!("  Starting equity: {:.2}", bt.starting_capital);
    println!("  Final equity:    {:.2}", bt.final_equity());
    println!("  Gross P&L:       {:.2}", bt.gross_pnl());
    println!("  Costs:           {:.2}", bt.total_cost());
    println!("  Turnover:        {:.4}", bt.total_turnover());
    println!("  Total return:    {:.2}%", m.total_return * 100.0);
    println!("  Ann. return:     {:.2}%", m.ann_return * 100.0);
    println!("  Ann. vol:        {:.2}%", m.ann_vol * 100.0);
    println!("  Sharpe:          {:.3}", m.sharpe);
    println!("  Max drawdown:    {:.2}%", m.max_drawdown * 100.0);
    println!(
        "  Trades:          {} (win rate {:.1}%, avg hold {:.1} bars)",
        t.count,
        t.win_rate * 100.0,
        t.average_holding_bars
    );
    for (reason, count) in &t.exits {
        println!("    {reason}: {count}");
    }
    if !bt.flags.is_empty() {
        println!("  Flagged bars:    {}", bt.flags.len());
    }
}

/// Pairs × z_in × lookback, with config values where a grid axis is empty
pub fn sweep_jobs(
    base: &StrategyConfig,
    pairs: &[PairArg],
    z_in: &[f64],
    lookback: &[usize],
) -> Vec<BatchJob> {
    let z_grid = if z_in.is_empty() { vec![base.signal.z_in] } else { z_in.to_vec() };
    let lb_grid = if lookback.is_empty() {
        vec![base.signal.lookback]
    } else {
        lookback.to_vec()
    };

    let mut jobs = Vec::with_capacity(pairs.len() * z_grid.len() * lb_grid.len());
    for pair in pairs {
        for &z in &z_grid {
            for &lb in &lb_grid {
                let mut config = base.clone();
                config.signal.z_in = z;
                config.signal.lookback = lb;
                jobs.push(
                    BatchJob::new(&pair.y, &pair.x, config)
                        .with_label(format!("{}/{} z_in={z} lookback={lb}", pair.y, pair.x)),
                );
            }
        }
    }
    jobs
}

/// Handle sweep command
fn sweep_command(cmd: SweepCmd, config: &Config) -> Result<()> {
    let base = StrategyConfig::from(config);
    let jobs = sweep_jobs(&base, &cmd.pairs, &cmd.z_in, &cmd.lookback);
    tracing::info!(jobs = jobs.len(), "starting sweep");

    let mut runner = BatchRunner::new(jobs).context("Invalid sweep grid")?;
    if cmd.sequential {
        runner = runner.sequential();
    }

    let prices = open_prices(config)?;
    let report = runner.run(&prices);
    print_batch(&report);

    if let Some(ref path) = cmd.export_json {
        export::export_json(path, &report)
            .with_context(|| format!("Failed to export JSON to {}", path.display()))?;
        println!("Exported report: {}", path.display());
    }

    Ok(())
}

fn print_batch(report: &BatchReport) {
    println!(
        "Sweep: {} jobs, {} succeeded, {} failed",
        report.total(),
        report.successes.len(),
        report.failures.len()
    );
    println!(
        "{:<40} {:>8} {:>10} {:>10} {:>7}",
        "job", "sharpe", "ann_ret", "max_dd", "trades"
    );
    for r in &report.successes {
        println!(
            "{:<40} {:>8.3} {:>9.2}% {:>9.2}% {:>7}",
            r.pair,
            r.metrics.sharpe,
            r.metrics.ann_return * 100.0,
            r.metrics.max_drawdown * 100.0,
            r.trade_stats.count
        );
    }
    for f in &report.failures {
        println!("FAILED {}: {}", f.label, f.error);
    }
}

/// Handle simulate command
fn simulate_command(cmd: SimulateCmd) -> Result<()> {
    let table = SyntheticPair::default()
        .with_days(cmd.days)
        .with_beta(cmd.beta)
        .with_phi(cmd.phi)
        .with_seed(cmd.seed)
        .generate()?;

    let file = File::create(&cmd.out)
        .with_context(|| format!("Failed to create {}", cmd.out.display()))?;
    let mut out = BufWriter::new(file);
    write_price_table(&mut out, &table)?;
    out.flush()?;

    println!(
        "Wrote {} bars of {} to {}",
        table.dates().len(),
        table.tickers().join("/"),
        cmd.out.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use tempfile::tempdir;

    #[test]
    fn test_cli_app_parse_backtest() {
        let args = vec![
            "butters-pairs", "backtest", "--config", "test.toml", "--y", "PEP", "--x", "KO",
            "--cost-bps", "2.5",
        ];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Backtest(cmd) => {
                assert_eq!(cmd.config, PathBuf::from("test.toml"));
                assert_eq!(cmd.y.as_deref(), Some("PEP"));
                assert_eq!(cmd.cost_bps, Some(2.5));
                assert!(cmd.capital.is_none());
            }
            _ => panic!("Expected Backtest command"),
        }
    }

    #[test]
    fn test_cli_app_parse_stats_defaults() {
        let app = CliApp::try_parse_from(vec!["butters-pairs", "stats", "--debug"]).unwrap();
        assert!(app.debug);
        assert_eq!(
            app.command.config_path(),
            Some(Path::new("config/pairs.toml"))
        );
    }

    #[test]
    fn test_cli_app_parse_sweep() {
        let args = vec![
            "butters-pairs",
            "sweep",
            "--pairs",
            "A:B,C:D",
            "--z-in",
            "1.5,2.0",
            "--lookback",
            "20,40,60",
        ];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Sweep(cmd) => {
                assert_eq!(cmd.pairs.len(), 2);
                assert_eq!(cmd.pairs[1], PairArg { y: "C".into(), x: "D".into() });
                assert_eq!(cmd.z_in, vec![1.5, 2.0]);
                assert_eq!(cmd.lookback, vec![20, 40, 60]);
            }
            _ => panic!("Expected Sweep command"),
        }
    }

    #[test]
    fn test_sweep_requires_valid_pairs() {
        assert!(CliApp::try_parse_from(vec!["butters-pairs", "sweep"]).is_err());
        assert!(CliApp::try_parse_from(vec!["butters-pairs", "sweep", "--pairs", "AB"]).is_err());
        assert!(parse_pair("A:").is_err());
    }

    #[test]
    fn test_cli_app_parse_simulate() {
        let args = vec!["butters-pairs", "simulate", "--out", "p.csv", "--seed", "11"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Simulate(ref cmd) => {
                assert_eq!(cmd.seed, 11);
                assert_eq!(cmd.days, 756);
                assert_eq!(cmd.beta, 1.5);
            }
            _ => panic!("Expected Simulate command"),
        }
        assert!(app.command.config_path().is_none());
    }

    #[test]
    fn test_sweep_grid_expansion() {
        let base = StrategyConfig::default();
        let pairs = vec![parse_pair("A:B").unwrap(), parse_pair("C:D").unwrap()];

        let jobs = sweep_jobs(&base, &pairs, &[1.5, 2.5], &[]);
        assert_eq!(jobs.len(), 4);
        assert_eq!(jobs[1].config.signal.z_in, 2.5);
        assert_eq!(jobs[1].config.signal.lookback, base.signal.lookback);
        assert_eq!(jobs[2].y, "C");
        assert!(jobs[3].label.starts_with("C/D"));
    }

    #[test]
    fn test_resolve_legs() {
        let data = DataSection {
            y: Some("PEP".into()),
            ..Default::default()
        };
        assert!(resolve_legs(None, None, &data).is_err());
        let (y, x) = resolve_legs(None, Some("KO".into()), &data).unwrap();
        assert_eq!((y.as_str(), x.as_str()), ("PEP", "KO"));
    }

    #[test]
    fn test_simulate_then_backtest() {
        let dir = tempdir().unwrap();
        let prices = dir.path().join("prices.csv");
        let table_out = dir.path().join("bt.csv");
        let json_out = dir.path().join("report.json");

        simulate_command(SimulateCmd {
            out: prices.clone(),
            days: 300,
            beta: 1.5,
            phi: 0.8,
            seed: 3,
        })
        .unwrap();

        let config = parse_config(&format!(
            concat!(
                "[data]\nprices_csv = \"{}\"\ny = \"SYN_Y\"\nx = \"SYN_X\"\n",
                "[strategy]\nlookback = 30\n",
            ),
            prices.display()
        ))
        .unwrap();
        if std::env::var(crate::config::PRICES_CSV_ENV).is_ok() {
            return;
        }

        backtest_command(
            BacktestCmd {
                config: PathBuf::from("unused.toml"),
                y: None,
                x: None,
                capital: Some(10_000.0),
                cost_bps: None,
                export_csv: Some(table_out.clone()),
                export_trades: None,
                export_json: Some(json_out.clone()),
            },
            &config,
        )
        .unwrap();

        let csv = std::fs::read_to_string(&table_out).unwrap();
        assert_eq!(csv.lines().count(), 301);
        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_out).unwrap()).unwrap();
        assert_eq!(report["backtest"]["starting_capital"], 10_000.0);
        assert_eq!(report["y_ticker"], "SYN_Y");
    }
}
