use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};

use crate::error::{BalanceError, Result};
use crate::estimators::types::{EstimateContext, GenerationEstimator};

/// Stochastic wind generation estimate.
///
/// Draws short-term variability around an assumed average site output from a
/// normal distribution. Negative draws are floored to 0 W: a turbine does not
/// consume power in this model, and a negative figure would grow the unmet
/// demand inside a waterfall.
///
/// The random source is injected so that runs are reproducible.
#[derive(Debug, Clone)]
pub struct WindEstimator {
    /// Mean output in watts.
    pub mean_w: f64,

    /// Standard deviation of the output in watts.
    pub std_dev_w: f64,

    distribution: Normal<f64>,

    /// Random number generator for sampling.
    rng: StdRng,
}

impl WindEstimator {
    /// Creates a wind estimator seeded from `seed`.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if the distribution parameters are invalid.
    pub fn new(mean_w: f64, std_dev_w: f64, seed: u64) -> Result<Self> {
        Self::with_rng(mean_w, std_dev_w, StdRng::seed_from_u64(seed))
    }

    /// Creates a wind estimator drawing from the given generator.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if the distribution parameters are invalid.
    pub fn with_rng(mean_w: f64, std_dev_w: f64, rng: StdRng) -> Result<Self> {
        if !mean_w.is_finite() {
            return Err(BalanceError::config("wind.mean_w", "must be finite"));
        }
        if !std_dev_w.is_finite() || std_dev_w < 0.0 {
            return Err(BalanceError::config("wind.std_dev_w", "must be finite and >= 0"));
        }
        let distribution = Normal::new(mean_w, std_dev_w)
            .map_err(|e| BalanceError::config("wind.std_dev_w", e.to_string()))?;
        Ok(Self {
            mean_w,
            std_dev_w,
            distribution,
            rng,
        })
    }

    /// 50 W average with 15 W standard deviation.
    pub fn reference(seed: u64) -> Result<Self> {
        Self::new(50.0, 15.0, seed)
    }

    /// Draws one sample (W), floored to 0.
    pub fn sample_w(&mut self) -> f64 {
        self.distribution.sample(&mut self.rng).max(0.0)
    }
}

impl GenerationEstimator for WindEstimator {
    fn estimate_w(&mut self, _context: &EstimateContext) -> Result<f64> {
        let w = self.sample_w();
        if !w.is_finite() {
            return Err(BalanceError::estimation("wind", "sample is not finite"));
        }
        Ok(w)
    }

    fn estimator_type(&self) -> &'static str {
        "WindNormal"
    }
}
