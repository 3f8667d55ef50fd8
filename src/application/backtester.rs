//! Backtester
//!
//! Converts sized leg weights into daily P&L, costs, turnover and equity.
//! Leg weights are fractions of current equity. A weight decided at the
//! close of t-1 earns the close-to-close return over [t-1, t]:
//!
//!   daily_return_t = pY(t-1)·rY_t + pX(t-1)·rX_t
//!   turnover_t     = |pY(t) - pY(t-1)| + |pX(t) - pX(t-1)|
//!   cost_t         = turnover_t · cost_bps / 10_000
//!   net_return_t   = daily_return_t - cost_t
//!   equity_t       = equity_{t-1} · (1 + net_return_t)
//!
//! The book is flat before the first bar, so equity_{-1} is the starting capital.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::{EngineError, EngineResult};
use crate::domain::price::{simple_return, AlignedPair};
use crate::domain::trade::{TradeRecord, TradeSpan};
use crate::strategy::params::{BacktestConfig, ConfigError};
use crate::strategy::sizing::SizedPositions;

/// One row of the backtest table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRow {
    pub date: NaiveDate,
    pub position_y: f64,
    pub position_x: f64,
    pub z: Option<f64>,
    /// Gross return of the positions held over [t-1, t]
    pub daily_return: f64,
    pub cost: f64,
    pub net_return: f64,
    pub turnover: f64,
    pub equity: f64,
    /// Currency P&L booked on this bar (net)
    pub pnl: f64,
}

/// Pair leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leg {
    Y,
    X,
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leg::Y => write!(f, "Y"),
            Leg::X => write!(f, "X"),
        }
    }
}

/// Bar whose leg return was zeroed because the prior price was zero
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceFlag {
    pub date: NaiveDate,
    pub leg: Leg,
    pub ticker: String,
}

/// Full backtest output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub starting_capital: f64,
    pub rows: Vec<BacktestRow>,
    pub flags: Vec<PriceFlag>,
    pub trades: Vec<TradeRecord>,
}

impl BacktestResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn final_equity(&self) -> f64 {
        self.rows.last().map_or(self.starting_capital, |r| r.equity)
    }

    /// Final equity minus starting capital
    pub fn cumulative_pnl(&self) -> f64 {
        self.final_equity() - self.starting_capital
    }

    pub fn net_returns(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.net_return).collect()
    }

    pub fn equity_curve(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.equity).collect()
    }

    pub fn total_turnover(&self) -> f64 {
        self.rows.iter().map(|r| r.turnover).sum()
    }

    /// Costs in currency
    pub fn total_cost(&self) -> f64 {
        self.currency_sum(|r| r.cost)
    }

    /// Gross P&L in currency, before costs
    pub fn gross_pnl(&self) -> f64 {
        self.currency_sum(|r| r.daily_return)
    }

    fn currency_sum(&self, field: impl Fn(&BacktestRow) -> f64) -> f64 {
        let mut prev_equity = self.starting_capital;
        let mut total = 0.0;
        for row in &self.rows {
            total += field(row) * prev_equity;
            prev_equity = row.equity;
        }
        total
    }
}

/// Cost-aware daily backtester
#[derive(Debug, Clone)]
pub struct Backtester {
    config: BacktestConfig,
}

impl Backtester {
    pub fn new(config: BacktestConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run over an aligned pair. `z` and `spans` are carried into the
    /// output table and trade list; they do not affect P&L.
    pub fn run(
        &self,
        pair: &AlignedPair,
        positions: &SizedPositions,
        z: &[Option<f64>],
        spans: &[TradeSpan],
    ) -> EngineResult<BacktestResult> {
        let n = pair.len();
        if n == 0 {
            return Err(EngineError::EmptySeries {
                context: format!("backtest of {}", pair.label()),
            });
        }
        if positions.position_y.len() != n || positions.position_x.len() != n || z.len() != n {
            return Err(EngineError::degenerate(
                "positions",
                None,
                format!(
                    "expected {n} bars, got positions {}/{} and z {}",
                    positions.position_y.len(),
                    positions.position_x.len(),
                    z.len()
                ),
            ));
        }

        let rate = self.config.cost_bps / 10_000.0;
        let mut rows = Vec::with_capacity(n);
        let mut flags = Vec::new();
        let mut equity = self.config.starting_capital;
        let (mut prev_y, mut prev_x) = (0.0, 0.0);

        for t in 0..n {
            let (py, px) = (positions.position_y[t], positions.position_x[t]);

            let daily_return = if t == 0 {
                0.0
            } else {
                let ry = self.leg_return(pair, t, Leg::Y, &mut flags);
                let rx = self.leg_return(pair, t, Leg::X, &mut flags);
                prev_y * ry + prev_x * rx
            };

            let turnover = (py - prev_y).abs() + (px - prev_x).abs();
            let cost = turnover * rate;
            let net_return = daily_return - cost;
            let pnl = net_return * equity;
            equity *= 1.0 + net_return;

            rows.push(BacktestRow {
                date: pair.dates[t],
                position_y: py,
                position_x: px,
                z: z[t],
                daily_return,
                cost,
                net_return,
                turnover,
                equity,
                pnl,
            });

            prev_y = py;
            prev_x = px;
        }

        let daily_pnl: Vec<f64> = rows.iter().map(|r| r.pnl).collect();
        let trades = spans
            .iter()
            .filter(|s| s.exit_index < n)
            .map(|s| TradeRecord::from_span(s, &pair.dates, &daily_pnl))
            .collect::<Vec<_>>();

        let result = BacktestResult {
            starting_capital: self.config.starting_capital,
            rows,
            flags,
            trades,
        };

        tracing::info!(
            pair = %pair.label(),
            bars = n,
            trades = result.trades.len(),
            final_equity = result.final_equity(),
            turnover = result.total_turnover(),
            "backtest complete"
        );

        Ok(result)
    }

    fn leg_return(
        &self,
        pair: &AlignedPair,
        t: usize,
        leg: Leg,
        flags: &mut Vec<PriceFlag>,
    ) -> f64 {
        let (prices, ticker) = match leg {
            Leg::Y => (&pair.y, &pair.y_ticker),
            Leg::X => (&pair.x, &pair.x_ticker),
        };
        match simple_return(prices[t - 1], prices[t]) {
            Some(r) => r,
            None => {
                tracing::warn!(
                    date = %pair.dates[t],
                    leg = %leg,
                    ticker = %ticker,
                    "prior price is zero, leg return treated as zero"
                );
                flags.push(PriceFlag {
                    date: pair.dates[t],
                    leg,
                    ticker: ticker.clone(),
                });
                0.0
            }
        }
    }
}
