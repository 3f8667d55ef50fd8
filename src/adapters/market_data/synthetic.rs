//! Synthetic Cointegrated Pair
//!
//! Offline price generator for smoke runs:
//! - X follows a geometric random walk with daily drift and volatility
//! - the spread follows an AR(1): S_t = φ·S_{t-1} + σ·ε_t
//! - Y = β·X + S
//!
//! Seeded, so a given configuration always produces the same table.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand::distributions::Distribution;
use statrs::distribution::Normal;

use crate::domain::error::{EngineError, EngineResult};
use crate::domain::price::PriceTable;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticPair {
    pub y_ticker: String,
    pub x_ticker: String,
    pub start: NaiveDate,
    pub days: usize,
    pub beta: f64,
    /// AR(1) coefficient of the spread, |φ| < 1 for mean reversion
    pub phi: f64,
    pub spread_sigma: f64,
    pub x0: f64,
    pub drift: f64,
    pub volatility: f64,
    pub seed: u64,
}

impl Default for SyntheticPair {
    fn default() -> Self {
        Self {
            y_ticker: "SYN_Y".to_string(),
            x_ticker: "SYN_X".to_string(),
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            days: 756,
            beta: 1.5,
            phi: 0.9,
            spread_sigma: 1.0,
            x0: 100.0,
            drift: 0.0002,
            volatility: 0.01,
            seed: 7,
        }
    }
}

impl SyntheticPair {
    pub fn with_days(mut self, days: usize) -> Self {
        self.days = days;
        self
    }

    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    pub fn with_phi(mut self, phi: f64) -> Self {
        self.phi = phi;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Generate the two-column price table
    pub fn generate(&self) -> EngineResult<PriceTable> {
        if self.days == 0 {
            return Err(EngineError::EmptySeries {
                context: "synthetic pair with zero days".to_string(),
            });
        }
        let normal = |sigma: f64| {
            Normal::new(0.0, sigma)
                .map_err(|e| EngineError::degenerate("synthetic", None, e.to_string()))
        };
        let x_shock = normal(self.volatility)?;
        let s_shock = normal(self.spread_sigma)?;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut x = Vec::with_capacity(self.days);
        let mut y = Vec::with_capacity(self.days);
        let (mut log_x, mut s) = (self.x0.ln(), 0.0);

        for t in 0..self.days {
            if t > 0 {
                log_x += self.drift - 0.5 * self.volatility.powi(2) + x_shock.sample(&mut rng);
                s = self.phi * s + s_shock.sample(&mut rng);
            }
            let xt = log_x.exp();
            x.push(Some(xt));
            y.push(Some(self.beta * xt + s));
        }

        let dates = (0..self.days as i64)
            .map(|i| self.start + Duration::days(i))
            .collect();
        let mut table = PriceTable::new(dates)?;
        table.insert_column(self.y_ticker.clone(), y)?;
        table.insert_column(self.x_ticker.clone(), x)?;

        tracing::debug!(
            days = self.days,
            beta = self.beta,
            phi = self.phi,
            seed = self.seed,
            "synthetic pair generated"
        );
        Ok(table)
    }
}
