use chrono::{Local, Timelike};

use crate::error::{BalanceError, Result};
use crate::estimators::types::{EstimateContext, GenerationEstimator};

/// Time-of-day solar generation estimate.
///
/// Produces a cos² profile between sunrise and sunset with a single peak at
/// the middle of the window and zero at both edges:
///
/// ```text
/// n = (hour - sunrise) / (sunset - sunrise)
/// P = capacity_w * cos²(π · (n - 0.5))
/// ```
///
/// Stateless: the same hour always yields the same figure.
///
/// # Examples
///
/// ```
/// use hybrid_balancer::estimators::SolarEstimator;
///
/// let solar = SolarEstimator::reference();
/// assert_eq!(solar.estimate_at(6), 0.0);
/// assert!((solar.estimate_at(12) - 600.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SolarEstimator {
    /// Output at the daily peak, in watts.
    pub capacity_w: f64,

    /// Hour when generation starts (exclusive edge, output is zero).
    pub sunrise_hour: u32,

    /// Hour when generation stops (exclusive edge, output is zero).
    pub sunset_hour: u32,
}

impl SolarEstimator {
    /// Creates a solar estimator.
    ///
    /// # Arguments
    ///
    /// * `capacity_w` - Peak output in watts (negative values clamp to 0)
    /// * `sunrise_hour` - Start of the generation window (0-23)
    /// * `sunset_hour` - End of the generation window (0-23, > sunrise)
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if the window is empty or out of range.
    pub fn new(capacity_w: f64, sunrise_hour: u32, sunset_hour: u32) -> Result<Self> {
        if sunrise_hour >= sunset_hour || sunset_hour > 23 {
            return Err(BalanceError::config(
                "solar.sunrise_hour",
                "must be < solar.sunset_hour, and sunset_hour must be <= 23",
            ));
        }
        Ok(Self {
            capacity_w: capacity_w.max(0.0),
            sunrise_hour,
            sunset_hour,
        })
    }

    /// 600 W array, generating between 06:00 and 18:00.
    pub fn reference() -> Self {
        Self {
            capacity_w: 600.0,
            sunrise_hour: 6,
            sunset_hour: 18,
        }
    }

    /// Fraction of peak output for an hour of day, in `[0, 1]`.
    fn daylight_frac(&self, hour: u32) -> f64 {
        if hour <= self.sunrise_hour || hour >= self.sunset_hour {
            return 0.0;
        }
        let span = f64::from(self.sunset_hour - self.sunrise_hour);
        let normalized = f64::from(hour - self.sunrise_hour) / span;
        let c = (std::f64::consts::PI * (normalized - 0.5)).cos();
        (c * c).clamp(0.0, 1.0)
    }

    /// Estimated output for an hour of day (W). Never negative.
    pub fn estimate_at(&self, hour: u32) -> f64 {
        (self.capacity_w * self.daylight_frac(hour)).max(0.0)
    }

    /// Estimated output for the current local hour (W).
    pub fn estimate_now(&self) -> f64 {
        self.estimate_at(Local::now().hour())
    }
}

impl GenerationEstimator for SolarEstimator {
    fn estimate_w(&mut self, context: &EstimateContext) -> Result<f64> {
        Ok(self.estimate_at(context.hour))
    }

    fn estimator_type(&self) -> &'static str {
        "SolarCurve"
    }
}
