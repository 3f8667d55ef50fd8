//! Z-Score Gate
//!
//! Rolling z-score of the spread over a fixed lookback window:
//!
//!   z_t = (S_t - mean(S[t-L+1..=t])) / std(S[t-L+1..=t])
//!
//! std is the sample standard deviation (n - 1 denominator). z is undefined
//! until the window is full and whenever the window has no dispersion.

use std::collections::VecDeque;

/// Rolling std below this leaves z undefined
const MIN_STD: f64 = 1e-12;

/// Result of z-score calculation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScoreResult {
    pub z_score: f64,
    /// Rolling mean used in calculation
    pub mean: f64,
    /// Rolling sample standard deviation
    pub std_dev: f64,
    /// Latest spread value
    pub value: f64,
}

/// Streaming z-score over the last `lookback` values
#[derive(Debug, Clone)]
pub struct ZScoreGate {
    lookback: usize,
    buffer: VecDeque<f64>,
}

impl ZScoreGate {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback,
            buffer: VecDeque::with_capacity(lookback + 1),
        }
    }

    /// Push the next spread value and return the z-score for it
    pub fn update(&mut self, value: f64) -> Option<ZScoreResult> {
        self.buffer.push_back(value);
        while self.buffer.len() > self.lookback {
            self.buffer.pop_front();
        }
        self.calculate()
    }

    /// Z-score of the latest value against the current window
    pub fn calculate(&self) -> Option<ZScoreResult> {
        if !self.is_ready() || self.lookback < 2 {
            return None;
        }

        let n = self.buffer.len() as f64;
        let mean = self.buffer.iter().sum::<f64>() / n;
        let variance = self
            .buffer
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / (n - 1.0);
        let std_dev = variance.sqrt();

        if !std_dev.is_finite() || std_dev < MIN_STD {
            return None;
        }

        let value = *self.buffer.back()?;
        Some(ZScoreResult {
            z_score: (value - mean) / std_dev,
            mean,
            std_dev,
            value,
        })
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_ready(&self) -> bool {
        self.buffer.len() >= self.lookback
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }
}

/// Rolling z-score for every bar of `series`
pub fn rolling_zscore(series: &[f64], lookback: usize) -> Vec<Option<f64>> {
    let mut gate = ZScoreGate::new(lookback);
    series
        .iter()
        .map(|&v| gate.update(v).map(|r| r.z_score))
        .collect()
}
