//! Position Sizer
//!
//! Ordered pipeline of size-adjustment layers applied to the base ±1 signal:
//!
//! 1. `DynamicScaling` (dynamic mode): × min(|z| / z_in, cap)
//! 2. `RegimeGate` (optional): 0 while the trailing spread fails the regime checks
//! 3. `VolTarget` (optional): × min(target / max(realized, floor), max_scale)
//! 4. `CapClamp`: clamp to [-cap, cap]
//!
//! Legs: position_y = m · unit_notional, position_x = -β · m · unit_notional.

use serde::{Deserialize, Serialize};

use crate::domain::error::{EngineError, EngineResult};
use crate::domain::position::PositionState;
use crate::domain::price::simple_return;
use crate::strategy::params::{ConfigError, SizingMode, StrategyConfig, VolTargetConfig};
use crate::strategy::regime::RegimeFilter;

/// Everything a layer may look at. All slices share one date index.
#[derive(Debug, Clone, Copy)]
pub struct SizingInputs<'a> {
    pub states: &'a [PositionState],
    pub z: &'a [Option<f64>],
    pub spread: &'a [f64],
    pub y: &'a [f64],
    pub x: &'a [f64],
    pub beta: f64,
}

impl SizingInputs<'_> {
    fn len(&self) -> usize {
        self.states.len()
    }

    fn check(&self) -> EngineResult<()> {
        let n = self.len();
        let lengths = [self.z.len(), self.spread.len(), self.y.len(), self.x.len()];
        if lengths.iter().any(|&l| l != n) {
            return Err(EngineError::degenerate(
                "sizing inputs",
                None,
                format!("series lengths differ: states {n}, z/spread/y/x {lengths:?}"),
            ));
        }
        if !self.beta.is_finite() || self.beta == 0.0 {
            return Err(EngineError::degenerate(
                "hedge_ratio",
                None,
                format!("beta must be finite and nonzero, got {}", self.beta),
            ));
        }
        Ok(())
    }
}

/// One stage of the sizing pipeline
pub trait SizeLayer: Send + Sync {
    /// Adjust `multipliers` in place; `multipliers[t]` may only depend on inputs up to t
    fn apply(&self, inputs: &SizingInputs<'_>, multipliers: &mut [f64]);

    /// Layer name for logging
    fn name(&self) -> &'static str;
}

/// Scales by conviction: × min(|z| / z_in, cap)
#[derive(Debug, Clone)]
pub struct DynamicScaling {
    pub z_in: f64,
    pub cap: f64,
}

impl SizeLayer for DynamicScaling {
    fn apply(&self, inputs: &SizingInputs<'_>, multipliers: &mut [f64]) {
        for (m, z) in multipliers.iter_mut().zip(inputs.z) {
            match z {
                Some(z) => *m *= (z.abs() / self.z_in).min(self.cap),
                None => *m = 0.0,
            }
        }
    }

    fn name(&self) -> &'static str {
        "dynamic"
    }
}

/// Zeroes bars whose trailing spread window fails the regime checks
#[derive(Debug, Clone)]
pub struct RegimeGate {
    filter: RegimeFilter,
}

impl RegimeGate {
    pub fn new(filter: RegimeFilter) -> Self {
        Self { filter }
    }
}

impl SizeLayer for RegimeGate {
    fn apply(&self, inputs: &SizingInputs<'_>, multipliers: &mut [f64]) {
        let mut blocked = 0usize;
        for (t, m) in multipliers.iter_mut().enumerate() {
            // Only non-zero sizes need a verdict
            if *m == 0.0 {
                continue;
            }
            if !self.filter.status_at(inputs.spread, t).allows_trading() {
                *m = 0.0;
                blocked += 1;
            }
        }
        tracing::debug!(blocked, "regime gate applied");
    }

    fn name(&self) -> &'static str {
        "regime"
    }
}

/// Scales toward a target annualized volatility of the strategy's own returns
#[derive(Debug, Clone)]
pub struct VolTarget {
    config: VolTargetConfig,
    unit_notional: f64,
}

impl VolTarget {
    pub fn new(config: VolTargetConfig, unit_notional: f64) -> Self {
        Self {
            config,
            unit_notional,
        }
    }

    /// Scale factor per bar from the incoming (pre-vol-target) multipliers
    pub fn scales(&self, inputs: &SizingInputs<'_>, multipliers: &[f64]) -> Vec<f64> {
        let returns = strategy_returns(inputs, multipliers, self.unit_notional);
        let window = self.config.window;
        let annualizer = self.config.periods_per_year.sqrt();

        (0..returns.len())
            .map(|t| {
                // returns[0] is undefined; need `window` realized returns ending at t
                if t < window {
                    return 1.0;
                }
                let realized = sample_std(&returns[t + 1 - window..=t]) * annualizer;
                (self.config.target / realized.max(self.config.floor)).min(self.config.max_scale)
            })
            .collect()
    }
}

impl SizeLayer for VolTarget {
    fn apply(&self, inputs: &SizingInputs<'_>, multipliers: &mut [f64]) {
        let scales = self.scales(inputs, multipliers);
        for (m, s) in multipliers.iter_mut().zip(scales) {
            *m *= s;
        }
    }

    fn name(&self) -> &'static str {
        "vol_target"
    }
}

/// Final clamp to [-cap, cap]
#[derive(Debug, Clone)]
pub struct CapClamp {
    pub cap: f64,
}

impl SizeLayer for CapClamp {
    fn apply(&self, _inputs: &SizingInputs<'_>, multipliers: &mut [f64]) {
        for m in multipliers.iter_mut() {
            *m = m.clamp(-self.cap, self.cap);
        }
    }

    fn name(&self) -> &'static str {
        "cap"
    }
}

/// Daily return of the pair under `multipliers`, with a one-bar lag.
/// Bar 0 and zero-prior-price legs contribute 0.
fn strategy_returns(
    inputs: &SizingInputs<'_>,
    multipliers: &[f64],
    unit_notional: f64,
) -> Vec<f64> {
    let mut returns = vec![0.0; multipliers.len()];
    for t in 1..multipliers.len() {
        let m = multipliers[t - 1];
        if m == 0.0 {
            continue;
        }
        let ry = simple_return(inputs.y[t - 1], inputs.y[t]).unwrap_or(0.0);
        let rx = simple_return(inputs.x[t - 1], inputs.x[t]).unwrap_or(0.0);
        returns[t] = m * unit_notional * (ry - inputs.beta * rx);
    }
    returns
}

fn sample_std(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
}

/// Sized multipliers and the resulting leg weights (fractions of equity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizedPositions {
    pub multiplier: Vec<f64>,
    pub position_y: Vec<f64>,
    pub position_x: Vec<f64>,
}

impl SizedPositions {
    /// Hedged legs from multipliers: Y weight m·unit, X weight −β·m·unit
    pub fn from_multipliers(multiplier: Vec<f64>, beta: f64, unit_notional: f64) -> Self {
        let position_y = multiplier.iter().map(|m| m * unit_notional).collect();
        let position_x = multiplier.iter().map(|m| -beta * m * unit_notional).collect();
        Self {
            multiplier,
            position_y,
            position_x,
        }
    }

    pub fn len(&self) -> usize {
        self.multiplier.len()
    }

    pub fn is_empty(&self) -> bool {
        self.multiplier.is_empty()
    }
}

/// Runs the configured layers in order over the base signal
pub struct PositionSizer {
    layers: Vec<Box<dyn SizeLayer>>,
    unit_notional: f64,
}

impl std::fmt::Debug for PositionSizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionSizer")
            .field("layers", &self.layer_names())
            .field("unit_notional", &self.unit_notional)
            .finish()
    }
}

impl PositionSizer {
    pub fn new(config: &StrategyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let sizing = &config.sizing;
        let mut layers: Vec<Box<dyn SizeLayer>> = Vec::new();

        if sizing.mode == SizingMode::Dynamic {
            layers.push(Box::new(DynamicScaling {
                z_in: config.signal.z_in,
                cap: sizing.cap,
            }));
        }
        if let Some(regime) = &config.regime {
            layers.push(Box::new(RegimeGate::new(RegimeFilter::new(regime.clone())?)));
        }
        if let Some(vol) = &config.vol_target {
            layers.push(Box::new(VolTarget::new(vol.clone(), sizing.unit_notional)));
        }
        layers.push(Box::new(CapClamp { cap: sizing.cap }));

        Ok(Self {
            layers,
            unit_notional: sizing.unit_notional,
        })
    }

    /// Pipeline from explicit layers, applied in the given order
    pub fn from_layers(layers: Vec<Box<dyn SizeLayer>>, unit_notional: f64) -> Self {
        Self {
            layers,
            unit_notional,
        }
    }

    pub fn layer_names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|l| l.name()).collect()
    }

    pub fn size(&self, inputs: &SizingInputs<'_>) -> EngineResult<SizedPositions> {
        inputs.check()?;

        let mut multipliers: Vec<f64> = inputs.states.iter().map(PositionState::sign).collect();
        for layer in &self.layers {
            layer.apply(inputs, &mut multipliers);
        }

        tracing::debug!(layers = ?self.layer_names(), bars = multipliers.len(), "positions sized");
        Ok(SizedPositions::from_multipliers(
            multipliers,
            inputs.beta,
            self.unit_notional,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::params::{RegimeConfig, SizingConfig};
    use approx::assert_relative_eq;
    use PositionState::{Flat, LongSpread, ShortSpread};

    struct Fixture {
        states: Vec<PositionState>,
        z: Vec<Option<f64>>,
        spread: Vec<f64>,
        y: Vec<f64>,
        x: Vec<f64>,
    }

    impl Fixture {
        fn new(states: Vec<PositionState>, z: Vec<Option<f64>>) -> Self {
            let n = states.len();
            Self {
                states,
                z,
                spread: vec![0.0; n],
                y: (0..n).map(|i| 100.0 + i as f64).collect(),
                x: vec![50.0; n],
            }
        }

        fn inputs(&self) -> SizingInputs<'_> {
            SizingInputs {
                states: &self.states,
                z: &self.z,
                spread: &self.spread,
                y: &self.y,
                x: &self.x,
                beta: 2.0,
            }
        }
    }

    #[test]
    fn test_static_sizing_and_legs() {
        let fx = Fixture::new(
            vec![Flat, LongSpread, ShortSpread],
            vec![Some(0.0), Some(-2.5), Some(2.5)],
        );
        let config = StrategyConfig::default()
            .with_sizing(SizingConfig::default().with_unit_notional(0.5));
        let sized = PositionSizer::new(&config).unwrap().size(&fx.inputs()).unwrap();

        assert_eq!(sized.multiplier, vec![0.0, 1.0, -1.0]);
        assert_eq!(sized.position_y, vec![0.0, 0.5, -0.5]);
        assert_eq!(sized.position_x, vec![0.0, -1.0, 1.0]);
    }

    #[test]
    fn test_dynamic_sizing_is_capped() {
        let fx = Fixture::new(
            vec![LongSpread, ShortSpread, ShortSpread],
            vec![Some(-3.0), Some(2.0), Some(9.0)],
        );
        let config = StrategyConfig::default().with_sizing(SizingConfig::dynamic(2.0));
        let sized = PositionSizer::new(&config).unwrap().size(&fx.inputs()).unwrap();

        assert_relative_eq!(sized.multiplier[0], 1.5);
        assert_relative_eq!(sized.multiplier[1], -1.0);
        assert_relative_eq!(sized.multiplier[2], -2.0);
    }

    #[test]
    fn test_layer_order() {
        let config = StrategyConfig::default()
            .with_sizing(SizingConfig::dynamic(2.0))
            .with_regime(RegimeConfig::default())
            .with_vol_target(VolTargetConfig::new(0.1));
        let sizer = PositionSizer::new(&config).unwrap();
        assert_eq!(sizer.layer_names(), vec!["dynamic", "regime", "vol_target", "cap"]);
    }

    #[test]
    fn test_regime_gate_zeroes_during_warmup() {
        let n = 30;
        let fx = Fixture::new(vec![LongSpread; n], vec![Some(-2.5); n]);
        let filter = RegimeFilter::new(RegimeConfig {
            window: 25,
            ..RegimeConfig::default()
        })
        .unwrap();
        let mut m = vec![1.0; n];
        RegimeGate::new(filter).apply(&fx.inputs(), &mut m);
        assert!(m[..24].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_vol_target_scales_after_window() {
        let n = 12;
        let mut fx = Fixture::new(vec![LongSpread; n], vec![Some(-2.5); n]);
        // Y alternates +1% / -1%, X flat
        fx.y = (0..n).map(|i| if i % 2 == 0 { 100.0 } else { 101.0 }).collect();

        let layer = VolTarget::new(
            VolTargetConfig {
                target: 0.10,
                window: 4,
                floor: 0.01,
                max_scale: 100.0,
                periods_per_year: 252.0,
            },
            1.0,
        );
        let scales = layer.scales(&fx.inputs(), &vec![1.0; n]);

        assert!(scales[..4].iter().all(|&s| s == 1.0));
        let returns: Vec<f64> = (7..=10)
            .map(|t| (fx.y[t] - fx.y[t - 1]) / fx.y[t - 1])
            .collect();
        let expected = 0.10 / (sample_std(&returns) * 252.0_f64.sqrt());
        assert_relative_eq!(scales[10], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_vol_target_floor_and_max_scale() {
        let n = 10;
        let fx = Fixture::new(vec![Flat; n], vec![Some(0.0); n]);
        let layer = VolTarget::new(
            VolTargetConfig {
                target: 0.10,
                window: 3,
                floor: 0.05,
                max_scale: 1.5,
                periods_per_year: 252.0,
            },
            1.0,
        );
        // Flat book: realized vol 0, floored to 0.05, scale 2.0 capped at 1.5
        let scales = layer.scales(&fx.inputs(), &vec![0.0; n]);
        assert_relative_eq!(scales[9], 1.5);
    }

    #[test]
    fn test_cap_clamp() {
        let fx = Fixture::new(vec![Flat; 3], vec![None; 3]);
        let mut m = vec![5.0, -0.5, -7.0];
        CapClamp { cap: 2.0 }.apply(&fx.inputs(), &mut m);
        assert_eq!(m, vec![2.0, -0.5, -2.0]);
    }

    #[test]
    fn test_custom_pipeline() {
        struct Halve;
        impl SizeLayer for Halve {
            fn apply(&self, _: &SizingInputs<'_>, m: &mut [f64]) {
                m.iter_mut().for_each(|v| *v *= 0.5);
            }
            fn name(&self) -> &'static str {
                "halve"
            }
        }
        let fx = Fixture::new(vec![LongSpread, ShortSpread], vec![Some(-3.0), Some(3.0)]);
        let sizer = PositionSizer::from_layers(vec![Box::new(Halve)], 1.0);
        let sized = sizer.size(&fx.inputs()).unwrap();
        assert_eq!(sized.multiplier, vec![0.5, -0.5]);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let mut fx = Fixture::new(vec![Flat; 3], vec![None; 3]);
        fx.x.pop();
        let sizer = PositionSizer::new(&StrategyConfig::default()).unwrap();
        assert!(matches!(sizer.size(&fx.inputs()), Err(EngineError::DegenerateInput { .. })));
    }
}
