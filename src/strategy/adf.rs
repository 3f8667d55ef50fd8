//! Augmented Dickey-Fuller Test
//!
//! Unit-root test on a single series with a constant term:
//!
//!   Δy_t = α + γ·y_{t-1} + Σ_{i=1..p} δ_i·Δy_{t-i} + ε_t
//!
//! H0: γ = 0 (unit root, no mean reversion). The statistic is the t-value of γ.
//!
//! Lag policy: maximum lag by Schwert's rule ceil(12·(n/100)^¼), capped at
//! n/2 - 2. The lag is picked by minimum AIC over 0..=maxlag on a common
//! sample, then the regression is refit on every usable observation.
//! p-values use the MacKinnon (1994) response surface; critical values use
//! MacKinnon (2010).

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;

use crate::domain::error::{EngineError, EngineResult};

/// Minimum observations for a stationarity test
pub const MIN_ADF_OBSERVATIONS: usize = 20;

/// Default significance level for `is_stationary`
pub const DEFAULT_SIGNIFICANCE: f64 = 0.05;

// MacKinnon (1994), constant-only regression, one series
const TAU_MAX_C: f64 = 2.74;
const TAU_MIN_C: f64 = -18.83;
const TAU_STAR_C: f64 = -1.61;
const TAU_C_SMALLP: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_C_LARGEP: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

// MacKinnon (2010), constant-only regression, one series: 1%, 5%, 10%
const TAU_2010_C: [[f64; 4]; 3] = [
    [-3.43035, -6.5393, -16.786, -79.433],
    [-2.86154, -2.8903, -4.234, -40.040],
    [-2.56677, -1.5384, -2.809, 0.0],
];

/// Lag selection for the augmentation terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdfLag {
    /// Minimum AIC up to Schwert's maximum lag
    #[default]
    Aic,
    /// Always use exactly this many lagged differences
    Fixed(usize),
}

/// ADF critical values at the usual levels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    pub one_pct: f64,
    pub five_pct: f64,
    pub ten_pct: f64,
}

/// Outcome of a stationarity test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationarityResult {
    pub test_statistic: f64,
    pub p_value: f64,
    /// `p_value < significance`
    pub is_stationary: bool,
    pub significance: f64,
    pub used_lag: usize,
    pub nobs: usize,
    pub critical_values: CriticalValues,
}

/// Configured ADF test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdfTest {
    lag: AdfLag,
    significance: f64,
}

impl Default for AdfTest {
    fn default() -> Self {
        Self {
            lag: AdfLag::Aic,
            significance: DEFAULT_SIGNIFICANCE,
        }
    }
}

impl AdfTest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lag(mut self, lag: AdfLag) -> Self {
        self.lag = lag;
        self
    }

    pub fn with_significance(mut self, significance: f64) -> Self {
        self.significance = significance;
        self
    }

    /// Run the test on `series`
    pub fn run(&self, series: &[f64]) -> EngineResult<StationarityResult> {
        let n = series.len();
        if n < MIN_ADF_OBSERVATIONS {
            return Err(EngineError::insufficient("ADF test", MIN_ADF_OBSERVATIONS, n));
        }
        if series.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::degenerate(
                "spread",
                None,
                "series contains non-finite values",
            ));
        }

        let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();
        let maxlag = schwert_maxlag(n);

        let used_lag = match self.lag {
            AdfLag::Fixed(k) => {
                if k > maxlag {
                    return Err(EngineError::insufficient(
                        format!("ADF test with {k} lags"),
                        2 * (k + 2),
                        n,
                    ));
                }
                k
            }
            AdfLag::Aic => select_lag_by_aic(series, &diffs, maxlag)?,
        };

        let fit = adf_regression(series, &diffs, used_lag, used_lag)
            .ok_or_else(|| EngineError::degenerate("spread", None, "ADF regression is singular"))?;

        // An exact fit has no standard error; the sign of γ decides
        let test_statistic = if fit.std_error(0) > 0.0 {
            fit.t_value(0)
        } else if fit.params[0] < 0.0 {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
        let p_value = mackinnon_p_value(test_statistic);
        let critical_values = mackinnon_critical_values(fit.nobs);

        tracing::debug!(
            statistic = test_statistic,
            p_value,
            used_lag,
            nobs = fit.nobs,
            "ADF test"
        );

        Ok(StationarityResult {
            test_statistic,
            p_value,
            is_stationary: p_value < self.significance,
            significance: self.significance,
            used_lag,
            nobs: fit.nobs,
            critical_values,
        })
    }
}

/// Schwert's rule, capped so the longest regression keeps degrees of freedom
fn schwert_maxlag(n: usize) -> usize {
    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    schwert.min((n / 2).saturating_sub(2))
}

fn select_lag_by_aic(series: &[f64], diffs: &[f64], maxlag: usize) -> EngineResult<usize> {
    let mut best: Option<(f64, usize)> = None;
    for lag in 0..=maxlag {
        let Some(fit) = adf_regression(series, diffs, lag, maxlag) else {
            continue;
        };
        let aic = fit.aic();
        if best.map_or(true, |(b, _)| aic < b) {
            best = Some((aic, lag));
        }
    }
    best.map(|(_, lag)| lag)
        .ok_or_else(|| EngineError::degenerate("spread", None, "no ADF lag produced a regression"))
}

/// Regress Δy_t on [y_{t-1}, Δy_{t-1}..Δy_{t-lag}, 1] for t = first..diffs.len().
///
/// `diffs[t] = series[t+1] - series[t]`, so the lagged level for `diffs[t]` is `series[t]`.
fn adf_regression(series: &[f64], diffs: &[f64], lag: usize, first: usize) -> Option<OlsFit> {
    let rows = diffs.len().checked_sub(first)?;
    let cols = lag + 2;
    if rows <= cols {
        return None;
    }

    let x = DMatrix::from_fn(rows, cols, |r, c| {
        let t = first + r;
        match c {
            0 => series[t],
            c if c <= lag => diffs[t - c],
            _ => 1.0,
        }
    });
    let y = DVector::from_fn(rows, |r, _| diffs[first + r]);

    OlsFit::fit(&x, &y)
}

/// Ordinary least squares via the normal equations
#[derive(Debug, Clone)]
pub(crate) struct OlsFit {
    pub params: DVector<f64>,
    pub xtx_inv: DMatrix<f64>,
    pub ssr: f64,
    pub sigma2: f64,
    pub nobs: usize,
}

impl OlsFit {
    pub fn fit(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<Self> {
        let nobs = x.nrows();
        let k = x.ncols();
        if nobs <= k {
            return None;
        }
        let xtx = x.transpose() * x;
        let xtx_inv = xtx.try_inverse()?;
        let params = &xtx_inv * (x.transpose() * y);
        let residuals = y - x * &params;
        let ssr = residuals.dot(&residuals);
        let sigma2 = ssr / (nobs - k) as f64;
        if !params.iter().all(|p| p.is_finite()) {
            return None;
        }
        Some(Self {
            params,
            xtx_inv,
            ssr,
            sigma2,
            nobs,
        })
    }

    pub fn std_error(&self, i: usize) -> f64 {
        (self.sigma2 * self.xtx_inv[(i, i)]).sqrt()
    }

    pub fn t_value(&self, i: usize) -> f64 {
        self.params[i] / self.std_error(i)
    }

    /// Gaussian log-likelihood AIC
    pub fn aic(&self) -> f64 {
        let n = self.nobs as f64;
        let llf = -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0);
        -2.0 * llf + 2.0 * self.params.len() as f64
    }
}

/// Approximate p-value of an ADF statistic (constant, one series)
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic.is_nan() {
        return 1.0;
    }
    if statistic > TAU_MAX_C {
        return 1.0;
    }
    if statistic < TAU_MIN_C {
        return 0.0;
    }
    let coefs: &[f64] = if statistic <= TAU_STAR_C {
        &TAU_C_SMALLP
    } else {
        &TAU_C_LARGEP
    };
    let z = coefs
        .iter()
        .rev()
        .fold(0.0, |acc, c| acc * statistic + c);
    normal_cdf(z)
}

/// Finite-sample critical values for `nobs` regression observations
pub fn mackinnon_critical_values(nobs: usize) -> CriticalValues {
    let inv = 1.0 / nobs as f64;
    let value = |c: &[f64; 4]| c[0] + c[1] * inv + c[2] * inv.powi(2) + c[3] * inv.powi(3);
    CriticalValues {
        one_pct: value(&TAU_2010_C[0]),
        five_pct: value(&TAU_2010_C[1]),
        ten_pct: value(&TAU_2010_C[2]),
    }
}

/// Standard normal CDF
pub(crate) fn normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / std::f64::consts::SQRT_2)
}
