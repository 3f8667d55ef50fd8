//! Regime Filter
//!
//! Re-estimates stationarity and half-life on the trailing spread window
//! ending at each bar. Trading is allowed only while the window still looks
//! mean-reverting.

use serde::{Deserialize, Serialize};

use crate::domain::error::EngineResult;
use crate::strategy::adf::AdfTest;
use crate::strategy::cointegration::{half_life, HalfLife};
use crate::strategy::params::{ConfigError, RegimeConfig};

/// Regime verdict for one bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegimeStatus {
    /// Fewer than `window` spread values so far
    Warmup,
    Favorable,
    /// ADF p-value above `pmax`
    NotStationary { p_value: f64 },
    /// Half-life missing or outside the configured band
    HalfLifeOutOfBand { half_life: HalfLife },
    /// The window could not be estimated (constant spread, singular fit)
    Degenerate,
}

impl RegimeStatus {
    pub fn allows_trading(&self) -> bool {
        matches!(self, RegimeStatus::Favorable)
    }
}

/// Rolling stationarity / half-life gate
#[derive(Debug, Clone)]
pub struct RegimeFilter {
    config: RegimeConfig,
    adf: AdfTest,
}

impl RegimeFilter {
    pub fn new(config: RegimeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            adf: AdfTest::new(),
        })
    }

    pub fn config(&self) -> &RegimeConfig {
        &self.config
    }

    /// Verdict using `spread[..=t]` only
    pub fn status_at(&self, spread: &[f64], t: usize) -> RegimeStatus {
        let window = self.config.window;
        if t >= spread.len() || t + 1 < window {
            return RegimeStatus::Warmup;
        }
        let slice = &spread[t + 1 - window..=t];

        match self.evaluate(slice) {
            Ok(status) => status,
            Err(e) => {
                tracing::debug!(bar = t, error = %e, "regime window not estimable");
                RegimeStatus::Degenerate
            }
        }
    }

    /// Verdict for every bar
    pub fn statuses(&self, spread: &[f64]) -> Vec<RegimeStatus> {
        (0..spread.len()).map(|t| self.status_at(spread, t)).collect()
    }

    fn evaluate(&self, window: &[f64]) -> EngineResult<RegimeStatus> {
        if let Some(pmax) = self.config.pmax {
            let result = self.adf.run(window)?;
            if result.p_value > pmax {
                return Ok(RegimeStatus::NotStationary {
                    p_value: result.p_value,
                });
            }
        }

        let (lo, hi) = (self.config.halflife_min, self.config.halflife_max);
        if lo.is_some() || hi.is_some() {
            let hl = half_life(window)?;
            if !hl.within(lo, hi) {
                return Ok(RegimeStatus::HalfLifeOutOfBand { half_life: hl });
            }
        }

        Ok(RegimeStatus::Favorable)
    }
}
