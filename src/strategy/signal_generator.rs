//! Signal Generator
//!
//! Turns a spread into a rolling z-score and one position state per bar.
//!
//! State machine, evaluated in date order on today's z only:
//! - FLAT -> LONG_SPREAD when z <= -z_in, FLAT -> SHORT_SPREAD when z >= z_in
//!   (subject to the configured confirmation)
//! - in a position the first matching exit wins: stop (|z| >= stop), then
//!   take-profit (z through 0 by the margin), then target (|z| <= z_out)
//! - the exit bar is FLAT; re-entry is evaluated from the next bar
//! - undefined z forces FLAT and closes an open position

use crate::domain::position::{ExitReason, PositionState};
use crate::domain::trade::TradeSpan;
use crate::strategy::params::{ConfigError, Confirmation, SignalConfig};
use crate::strategy::zscore_gate::rolling_zscore;

/// Z-scores, states and round trips for one spread
#[derive(Debug, Clone, PartialEq)]
pub struct SignalOutput {
    pub z: Vec<Option<f64>>,
    pub states: Vec<PositionState>,
    pub spans: Vec<TradeSpan>,
}

impl SignalOutput {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Entry awaiting confirmation
#[derive(Debug, Clone, Copy, PartialEq)]
enum Pending {
    Idle,
    /// Consecutive bars the entry condition has held
    Counting { side: PositionState, bars: u32 },
    /// Most extreme z since the threshold cross
    Tracking { side: PositionState, extreme: f64 },
}

/// Z-score state machine
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    config: SignalConfig,
}

impl SignalGenerator {
    pub fn new(config: SignalConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Rolling z-score plus the state sequence it drives
    pub fn generate(&self, spread: &[f64]) -> SignalOutput {
        let z = rolling_zscore(spread, self.config.lookback);
        let (states, spans) = self.run_states(&z);

        tracing::debug!(
            bars = spread.len(),
            trades = spans.len(),
            lookback = self.config.lookback,
            "signals generated"
        );

        SignalOutput { z, states, spans }
    }

    /// Drive the state machine over a precomputed z series
    pub fn run_states(&self, z: &[Option<f64>]) -> (Vec<PositionState>, Vec<TradeSpan>) {
        let mut states = Vec::with_capacity(z.len());
        let mut spans = Vec::new();
        let mut state = PositionState::Flat;
        let mut entry_index = 0;
        let mut pending = Pending::Idle;

        for (t, zt) in z.iter().enumerate() {
            let Some(zt) = *zt else {
                if !state.is_flat() {
                    spans.push(TradeSpan {
                        entry_index,
                        exit_index: t,
                        entry_state: state,
                        exit_reason: ExitReason::InsufficientHistory,
                    });
                    state = PositionState::Flat;
                }
                pending = Pending::Idle;
                states.push(state);
                continue;
            };

            if state.is_flat() {
                if let Some(side) = self.confirm_entry(zt, &mut pending) {
                    state = side;
                    entry_index = t;
                }
            } else if let Some(reason) = self.exit_reason(state, zt) {
                spans.push(TradeSpan {
                    entry_index,
                    exit_index: t,
                    entry_state: state,
                    exit_reason: reason,
                });
                state = PositionState::Flat;
            }

            states.push(state);
        }

        if !state.is_flat() {
            spans.push(TradeSpan {
                entry_index,
                exit_index: z.len() - 1,
                entry_state: state,
                exit_reason: ExitReason::ForcedEnd,
            });
        }

        (states, spans)
    }

    /// Side whose entry threshold z is beyond
    fn entry_side(&self, z: f64) -> Option<PositionState> {
        if z <= -self.config.z_in {
            Some(PositionState::LongSpread)
        } else if z >= self.config.z_in {
            Some(PositionState::ShortSpread)
        } else {
            None
        }
    }

    fn confirm_entry(&self, z: f64, pending: &mut Pending) -> Option<PositionState> {
        let Some(side) = self.entry_side(z) else {
            *pending = Pending::Idle;
            return None;
        };

        match self.config.confirmation {
            Confirmation::None => Some(side),
            Confirmation::Bars(n) if n <= 1 => Some(side),
            Confirmation::Bars(n) => {
                let bars = match *pending {
                    Pending::Counting { side: s, bars } if s == side => bars + 1,
                    _ => 1,
                };
                if bars >= n {
                    *pending = Pending::Idle;
                    Some(side)
                } else {
                    *pending = Pending::Counting { side, bars };
                    None
                }
            }
            Confirmation::Reversal(delta) => {
                // Extreme is the largest |z| on this side since the cross
                let extreme = match *pending {
                    Pending::Tracking { side: s, extreme } if s == side => {
                        if z.abs() > extreme.abs() {
                            z
                        } else {
                            extreme
                        }
                    }
                    _ => z,
                };
                if extreme.abs() - z.abs() >= delta {
                    *pending = Pending::Idle;
                    Some(side)
                } else {
                    *pending = Pending::Tracking { side, extreme };
                    None
                }
            }
        }
    }

    fn exit_reason(&self, state: PositionState, z: f64) -> Option<ExitReason> {
        if z.abs() >= self.config.stop {
            return Some(ExitReason::Stop);
        }
        if let Some(tp) = self.config.take_profit {
            let hit = match state {
                PositionState::LongSpread => z >= tp,
                PositionState::ShortSpread => z <= -tp,
                PositionState::Flat => false,
            };
            if hit {
                return Some(ExitReason::TakeProfit);
            }
        }
        if z.abs() <= self.config.z_out {
            return Some(ExitReason::Target);
        }
        None
    }
}
