use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::position::{ExitReason, PositionState};

/// Bar indices of one round trip, as read off the state sequence.
///
/// `entry_index` is the first bar in the position; `exit_index` is the bar
/// on which the state returned to FLAT (or the last bar for `ForcedEnd`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeSpan {
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_state: PositionState,
    pub exit_reason: ExitReason,
}

impl TradeSpan {
    pub fn holding_bars(&self) -> usize {
        self.exit_index - self.entry_index
    }
}

/// A completed (or force-closed) round trip with its realized P&L
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_state: PositionState,
    /// P&L in currency, net of the costs paid on entry and exit bars
    pub pnl: f64,
    pub exit_reason: ExitReason,
    pub holding_bars: usize,
}

impl TradeRecord {
    /// Attach P&L to a span. `daily_pnl[t]` is the currency P&L booked on bar t.
    pub fn from_span(span: &TradeSpan, dates: &[NaiveDate], daily_pnl: &[f64]) -> Self {
        let pnl = daily_pnl[span.entry_index..=span.exit_index].iter().sum();
        Self {
            entry_date: dates[span.entry_index],
            exit_date: dates[span.exit_index],
            entry_state: span.entry_state,
            pnl,
            exit_reason: span.exit_reason,
            holding_bars: span.holding_bars(),
        }
    }

    pub fn is_profitable(&self) -> bool {
        self.pnl > 0.0
    }
}

impl fmt::Display for TradeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} ({} bars, {}): {:.2}",
            self.entry_state,
            self.entry_date,
            self.exit_date,
            self.holding_bars,
            self.exit_reason,
            self.pnl
        )
    }
}
