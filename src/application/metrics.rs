//! Performance Metrics
//!
//! Summary statistics of a daily return series and of the closed trades.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::trade::TradeRecord;

/// Annualized performance of a return series
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub ann_return: f64,
    pub ann_vol: f64,
    pub sharpe: f64,
    /// Most negative equity / running peak - 1 (≤ 0)
    pub max_drawdown: f64,
    pub total_return: f64,
    pub periods: usize,
}

impl PerformanceMetrics {
    /// Metrics of `returns`, annualized with `periods_per_year`.
    /// Non-finite entries are skipped; an empty series gives all zeros.
    pub fn from_returns(returns: &[f64], periods_per_year: f64) -> Self {
        let r: Vec<f64> = returns.iter().copied().filter(|v| v.is_finite()).collect();
        if r.is_empty() {
            return Self::default();
        }
        let n = r.len() as f64;

        let growth: f64 = r.iter().map(|v| 1.0 + v).product();
        let ann_return = growth.powf(periods_per_year / n) - 1.0;

        let ann_vol = if r.len() < 2 {
            0.0
        } else {
            let mean = r.iter().sum::<f64>() / n;
            let var = r.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            var.sqrt() * periods_per_year.sqrt()
        };
        let sharpe = if ann_vol == 0.0 { 0.0 } else { ann_return / ann_vol };

        let mut equity = 1.0;
        let mut peak = f64::MIN;
        let mut max_drawdown: f64 = 0.0;
        for v in &r {
            equity *= 1.0 + v;
            peak = peak.max(equity);
            max_drawdown = max_drawdown.min(equity / peak - 1.0);
        }

        Self {
            ann_return,
            ann_vol,
            sharpe,
            max_drawdown,
            total_return: growth - 1.0,
            periods: r.len(),
        }
    }
}

/// Closed-trade statistics
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TradeStats {
    pub count: usize,
    pub win_rate: f64,
    pub average_pnl: f64,
    pub total_pnl: f64,
    pub average_holding_bars: f64,
    /// Trades per exit reason, keyed by its display name
    pub exits: BTreeMap<String, usize>,
}

impl TradeStats {
    pub fn from_trades(trades: &[TradeRecord]) -> Self {
        if trades.is_empty() {
            return Self::default();
        }
        let count = trades.len();
        let wins = trades.iter().filter(|t| t.is_profitable()).count();
        let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
        let holding: usize = trades.iter().map(|t| t.holding_bars).sum();

        let mut exits = BTreeMap::new();
        for t in trades {
            *exits.entry(t.exit_reason.to_string()).or_insert(0) += 1;
        }

        Self {
            count,
            win_rate: wins as f64 / count as f64,
            average_pnl: total_pnl / count as f64,
            total_pnl,
            average_holding_bars: holding as f64 / count as f64,
            exits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{ExitReason, PositionState};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    #[test]
    fn test_empty_returns() {
        assert_eq!(PerformanceMetrics::from_returns(&[], 252.0), PerformanceMetrics::default());
    }

    #[test]
    fn test_metrics_values() {
        let r = [0.01, -0.02, 0.03, 0.0];
        let m = PerformanceMetrics::from_returns(&r, 252.0);

        let growth = 1.01 * 0.98 * 1.03;
        assert_relative_eq!(m.total_return, growth - 1.0, epsilon = 1e-12);
        assert_relative_eq!(m.ann_return, growth.powf(252.0 / 4.0) - 1.0, epsilon = 1e-9);

        let mean = 0.02 / 4.0;
        let var = r.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 3.0;
        assert_relative_eq!(m.ann_vol, var.sqrt() * 252.0_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(m.sharpe, m.ann_return / m.ann_vol, epsilon = 1e-12);
        assert_relative_eq!(m.max_drawdown, 0.98 - 1.0, epsilon = 1e-12);
        assert_eq!(m.periods, 4);
    }

    #[test]
    fn test_zero_vol_gives_zero_sharpe() {
        let m = PerformanceMetrics::from_returns(&[0.0; 10], 252.0);
        assert_eq!(m.sharpe, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
    }

    #[test]
    fn test_trade_stats() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let trade = |pnl: f64, reason: ExitReason, bars: usize| TradeRecord {
            entry_date: date,
            exit_date: date,
            entry_state: PositionState::LongSpread,
            pnl,
            exit_reason: reason,
            holding_bars: bars,
        };
        let trades = [
            trade(10.0, ExitReason::Target, 4),
            trade(-5.0, ExitReason::Stop, 2),
            trade(1.0, ExitReason::Target, 6),
        ];
        let stats = TradeStats::from_trades(&trades);

        assert_eq!(stats.count, 3);
        assert_relative_eq!(stats.win_rate, 2.0 / 3.0);
        assert_relative_eq!(stats.average_pnl, 2.0);
        assert_relative_eq!(stats.average_holding_bars, 4.0);
        assert_eq!(stats.exits["target"], 2);
        assert_eq!(stats.exits["stop"], 1);
    }
}
