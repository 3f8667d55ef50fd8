use serde::{Deserialize, Serialize};
use std::fmt;

/// Position held in the spread at the close of a bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionState {
    #[default]
    Flat,
    /// Long Y, short β·X
    LongSpread,
    /// Short Y, long β·X
    ShortSpread,
}

impl PositionState {
    /// Signed direction: +1 long spread, -1 short spread, 0 flat
    pub fn sign(&self) -> f64 {
        match self {
            PositionState::Flat => 0.0,
            PositionState::LongSpread => 1.0,
            PositionState::ShortSpread => -1.0,
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionState::Flat => write!(f, "FLAT"),
            PositionState::LongSpread => write!(f, "LONG_SPREAD"),
            PositionState::ShortSpread => write!(f, "SHORT_SPREAD"),
        }
    }
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// |z| fell back inside the exit band
    Target,
    /// |z| reached the stop threshold
    Stop,
    /// z crossed through zero by the take-profit margin
    TakeProfit,
    /// Still open on the last bar
    ForcedEnd,
    /// z became undefined (zero rolling std) while in a position
    InsufficientHistory,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::Target => "target",
            ExitReason::Stop => "stop",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::ForcedEnd => "forced_end",
            ExitReason::InsufficientHistory => "insufficient_history",
        };
        write!(f, "{s}")
    }
}
