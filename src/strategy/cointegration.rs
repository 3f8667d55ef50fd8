//! Cointegration Statistics
//!
//! Estimates on a pair of aligned price series:
//! - hedge ratio: no-intercept OLS slope of Y on X, β = Σxy / Σx²
//! - spread: S = Y - β·X
//! - half-life of the spread from the AR(1) fit ΔS_t = a + b·S_{t-1} + ε
//!
//! The stationarity test itself lives in [`crate::strategy::adf`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::{EngineError, EngineResult};
use crate::strategy::adf::{AdfTest, StationarityResult};

/// Σx² below this is treated as a zero-variance regressor
const MIN_SUM_SQUARES: f64 = 1e-12;
/// Variance of S_{t-1} below this makes the AR(1) fit degenerate
const MIN_VARIANCE: f64 = 1e-12;
/// Minimum spread length for a half-life estimate
pub const MIN_HALF_LIFE_OBSERVATIONS: usize = 20;

/// Mean-reversion speed of a spread
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HalfLife {
    /// Bars for a deviation to decay by half
    Bars { bars: f64 },
    /// AR(1) coefficient outside (-1, 0): no decay toward the mean
    NotMeanReverting { coefficient: f64 },
}

impl HalfLife {
    pub fn bars(&self) -> Option<f64> {
        match self {
            HalfLife::Bars { bars } => Some(*bars),
            HalfLife::NotMeanReverting { .. } => None,
        }
    }

    pub fn is_mean_reverting(&self) -> bool {
        matches!(self, HalfLife::Bars { .. })
    }

    /// True when mean-reverting with a half-life inside `[min, max]`.
    /// Missing bounds are unconstrained.
    pub fn within(&self, min: Option<f64>, max: Option<f64>) -> bool {
        match self.bars() {
            Some(h) => min.map_or(true, |lo| h >= lo) && max.map_or(true, |hi| h <= hi),
            None => false,
        }
    }
}

impl fmt::Display for HalfLife {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HalfLife::Bars { bars } => write!(f, "{bars:.2} bars"),
            HalfLife::NotMeanReverting { coefficient } => {
                write!(f, "not mean-reverting (b = {coefficient:.4})")
            }
        }
    }
}

/// The stats triple reported for a pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CointegrationStats {
    pub hedge_ratio: f64,
    pub stationarity: StationarityResult,
    pub half_life: HalfLife,
}

impl CointegrationStats {
    /// Estimate β on the full sample, then test the resulting spread
    pub fn estimate(y: &[f64], x: &[f64]) -> EngineResult<Self> {
        let beta = hedge_ratio(y, x)?;
        Self::with_hedge_ratio(y, x, beta)
    }

    /// Test the spread for a given β
    pub fn with_hedge_ratio(y: &[f64], x: &[f64], beta: f64) -> EngineResult<Self> {
        let s = spread(y, x, beta)?;
        Ok(Self {
            hedge_ratio: beta,
            stationarity: stationarity_test(&s)?,
            half_life: half_life(&s)?,
        })
    }
}

/// No-intercept OLS slope of `y` on `x`
pub fn hedge_ratio(y: &[f64], x: &[f64]) -> EngineResult<f64> {
    check_lengths(y, x)?;
    if y.len() < 2 {
        return Err(EngineError::insufficient("hedge ratio", 2, y.len()));
    }

    let sxx: f64 = x.iter().map(|v| v * v).sum();
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();

    if sxx < MIN_SUM_SQUARES {
        return Err(EngineError::degenerate("x", None, "sum of squares is zero"));
    }

    let beta = sxy / sxx;
    if !beta.is_finite() || beta == 0.0 {
        return Err(EngineError::degenerate(
            "hedge_ratio",
            None,
            format!("beta must be finite and nonzero, got {beta}"),
        ));
    }

    tracing::debug!(beta, n = y.len(), "hedge ratio estimated");
    Ok(beta)
}

/// S_i = Y_i - β·X_i
pub fn spread(y: &[f64], x: &[f64], beta: f64) -> EngineResult<Vec<f64>> {
    check_lengths(y, x)?;
    if !beta.is_finite() || beta == 0.0 {
        return Err(EngineError::degenerate(
            "hedge_ratio",
            None,
            format!("beta must be finite and nonzero, got {beta}"),
        ));
    }
    Ok(y.iter().zip(x).map(|(a, b)| a - beta * b).collect())
}

/// ADF test with the default lag policy and 5% significance
pub fn stationarity_test(spread: &[f64]) -> EngineResult<StationarityResult> {
    AdfTest::new().run(spread)
}

/// Half-life from ΔS_t = a + b·S_{t-1} + ε
pub fn half_life(spread: &[f64]) -> EngineResult<HalfLife> {
    let n = spread.len();
    if n < MIN_HALF_LIFE_OBSERVATIONS {
        return Err(EngineError::insufficient("half-life", MIN_HALF_LIFE_OBSERVATIONS, n));
    }

    let b = ar1_coefficient(spread)?;

    if b > -1.0 && b < 0.0 {
        let bars = -std::f64::consts::LN_2 / (1.0 + b).ln();
        Ok(HalfLife::Bars { bars })
    } else {
        Ok(HalfLife::NotMeanReverting { coefficient: b })
    }
}

/// Slope b of the regression of ΔS_t on S_{t-1} with intercept
fn ar1_coefficient(spread: &[f64]) -> EngineResult<f64> {
    let lagged = &spread[..spread.len() - 1];
    let m = lagged.len() as f64;
    let mean_lag = lagged.iter().sum::<f64>() / m;
    let deltas: Vec<f64> = spread.windows(2).map(|w| w[1] - w[0]).collect();
    let mean_delta = deltas.iter().sum::<f64>() / m;

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (s, d) in lagged.iter().zip(&deltas) {
        let dx = s - mean_lag;
        sxy += dx * (d - mean_delta);
        sxx += dx * dx;
    }

    if sxx / m < MIN_VARIANCE {
        return Err(EngineError::degenerate("spread", None, "lagged spread has zero variance"));
    }

    let b = sxy / sxx;
    if !b.is_finite() {
        return Err(EngineError::degenerate("spread", None, "AR(1) coefficient is not finite"));
    }
    Ok(b)
}

fn check_lengths(y: &[f64], x: &[f64]) -> EngineResult<()> {
    if y.len() != x.len() {
        return Err(EngineError::degenerate(
            "pair",
            None,
            format!("legs have different lengths ({} vs {})", y.len(), x.len()),
        ));
    }
    Ok(())
}
