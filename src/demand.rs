//! Demand Model: the load breakdown an allocation must satisfy.

use serde::{Deserialize, Serialize};

use crate::error::{BalanceError, Result};

/// Tolerance when checking `total_w` against the component sum (W).
const TOTAL_TOLERANCE_W: f64 = 1e-6;

/// One named load (e.g. monitoring stack, router, sensors).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadComponent {
    pub name: String,
    pub power_w: f64,
}

/// Aggregate load to satisfy in one allocation call.
///
/// `total_w` is the sum of the components and excludes the safety margin;
/// strategies add the margin themselves via [`EnergyDemand::target_w`].
/// Nothing recomputes `total_w` behind the caller's back: use
/// [`EnergyDemand::new`] to keep it in sync, and [`EnergyDemand::validate`]
/// catches drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyDemand {
    pub components: Vec<LoadComponent>,
    pub safety_margin_w: f64,
    pub total_w: f64,
}

impl EnergyDemand {
    /// Creates a demand whose `total_w` is the sum of `components`.
    pub fn new<N: Into<String>>(
        components: impl IntoIterator<Item = (N, f64)>,
        safety_margin_w: f64,
    ) -> Self {
        let components: Vec<LoadComponent> = components
            .into_iter()
            .map(|(name, power_w)| LoadComponent {
                name: name.into(),
                power_w,
            })
            .collect();
        let total_w = components.iter().map(|c| c.power_w).sum();
        Self {
            components,
            safety_margin_w,
            total_w,
        }
    }

    /// A single-component demand, handy for sweeps and tests.
    pub fn flat(load_w: f64, safety_margin_w: f64) -> Self {
        Self::new([("load", load_w)], safety_margin_w)
    }

    /// Figure every strategy must cover: components plus safety margin (W).
    pub fn target_w(&self) -> f64 {
        self.total_w + self.safety_margin_w
    }

    /// Sum of the named components (W).
    pub fn component_sum_w(&self) -> f64 {
        self.components.iter().map(|c| c.power_w).sum()
    }

    /// Rejects negative, non-finite, or inconsistent figures.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error describing the first offending figure.
    pub fn validate(&self) -> Result<()> {
        for c in &self.components {
            if !c.power_w.is_finite() || c.power_w < 0.0 {
                return Err(BalanceError::Validation(format!(
                    "load component \"{}\" must be finite and >= 0, got {}",
                    c.name, c.power_w
                )));
            }
        }
        if !self.safety_margin_w.is_finite() || self.safety_margin_w < 0.0 {
            return Err(BalanceError::Validation(format!(
                "safety_margin_w must be finite and >= 0, got {}",
                self.safety_margin_w
            )));
        }
        if !self.total_w.is_finite() || self.total_w < 0.0 {
            return Err(BalanceError::Validation(format!(
                "total_w must be finite and >= 0, got {}",
                self.total_w
            )));
        }
        let sum = self.component_sum_w();
        if (sum - self.total_w).abs() > TOTAL_TOLERANCE_W {
            return Err(BalanceError::Validation(format!(
                "total_w {} does not match component sum {sum}",
                self.total_w
            )));
        }
        Ok(())
    }
}

impl Default for EnergyDemand {
    /// Monitoring stack, connectivity, and IoT devices with a 50 W reserve.
    fn default() -> Self {
        Self::new(
            [
                ("monitoring_system", 150.0),
                ("connectivity", 80.0),
                ("iot_devices", 200.0),
            ],
            50.0,
        )
    }
}
