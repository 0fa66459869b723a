use crate::error::{BalanceError, Result};
use crate::estimators::types::{EstimateContext, GenerationEstimator};

/// Reports a fixed (or externally updated) reading.
///
/// Stands in for a live telemetry feed: whatever last called
/// [`FixedEstimator::set_w`] decides what the balancer sees. Also the
/// estimator of choice when a test needs to force a source to a known value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedEstimator {
    watts: f64,
}

impl FixedEstimator {
    pub fn new(watts: f64) -> Self {
        Self { watts }
    }

    /// Always reports 0 W.
    pub fn zero() -> Self {
        Self::new(0.0)
    }

    /// Replaces the reading.
    pub fn set_w(&mut self, watts: f64) {
        self.watts = watts;
    }
}

impl GenerationEstimator for FixedEstimator {
    fn estimate_w(&mut self, _context: &EstimateContext) -> Result<f64> {
        if !self.watts.is_finite() {
            return Err(BalanceError::estimation(
                "telemetry",
                format!("reading {} is not a number", self.watts),
            ));
        }
        Ok(self.watts.max(0.0))
    }

    fn estimator_type(&self) -> &'static str {
        "Fixed"
    }
}
