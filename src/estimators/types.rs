//! Common types and traits for generation estimators.

use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::sources::SourceKind;

/// Contextual information passed to estimators.
/// # Fields
/// * `hour` - Hour of day (0-23) the estimate is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimateContext {
    pub hour: u32,
}

impl EstimateContext {
    pub fn new(hour: u32) -> Self {
        Self { hour }
    }
}

/// Trait for anything that reports instantaneous available power for a
/// weather-dependent source.
///
/// Implementations may be pure models ([`SolarEstimator`](super::SolarEstimator)),
/// seeded stochastic models ([`WindEstimator`](super::WindEstimator)), or a
/// live telemetry reading ([`FixedEstimator`](super::FixedEstimator)). The
/// balancer treats them interchangeably.
pub trait GenerationEstimator: Send + fmt::Debug {
    /// Returns the available power (W) for the given context.
    ///
    /// # Errors
    ///
    /// Returns an `Estimation` error when no numeric figure can be produced.
    /// Callers treat that source as contributing 0 W.
    fn estimate_w(&mut self, context: &EstimateContext) -> Result<f64>;

    /// Returns a human-readable type name for the estimator.
    fn estimator_type(&self) -> &'static str;
}

/// Renewable output figures sampled for one allocation cycle (W).
///
/// Strategies read solar and wind from this snapshot rather than from the
/// registry, so every strategy sees the same sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Generation {
    pub solar_w: f64,
    pub wind_w: f64,
}

impl Generation {
    pub fn new(solar_w: f64, wind_w: f64) -> Self {
        Self { solar_w, wind_w }
    }

    /// Estimated output for a renewable kind; 0 for firm sources.
    pub fn get(&self, kind: SourceKind) -> f64 {
        match kind {
            SourceKind::Solar => self.solar_w,
            SourceKind::Wind => self.wind_w,
            SourceKind::Grid | SourceKind::Battery => 0.0,
        }
    }
}
