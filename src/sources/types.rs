//! Common types describing an energy source.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BalanceError;

/// Class of an energy source.
///
/// Every allocation strategy addresses sources by class, so a registry holds
/// at most one source per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Grid,
    Solar,
    Wind,
    Battery,
}

impl SourceKind {
    /// All kinds in registry order.
    pub const ALL: [SourceKind; 4] = [Self::Grid, Self::Solar, Self::Wind, Self::Battery];

    /// Lowercase identifier used in maps and exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::Solar => "solar",
            Self::Wind => "wind",
            Self::Battery => "battery",
        }
    }

    /// Weather-dependent sources whose availability comes from an estimator.
    pub fn is_renewable(&self) -> bool {
        matches!(self, Self::Solar | Self::Wind)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = BalanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "grid" => Ok(Self::Grid),
            "solar" => Ok(Self::Solar),
            "wind" => Ok(Self::Wind),
            "battery" => Ok(Self::Battery),
            _ => Err(BalanceError::config(
                "sources.kind",
                format!("unknown source kind \"{s}\", expected grid, solar, wind or battery"),
            )),
        }
    }
}

/// A named provider of electrical power.
///
/// Strategies only ever read sources; the owning balancer (or an external
/// telemetry feed going through it) is the sole writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergySource {
    /// Display name (e.g. `"Main Grid (Kyivstar)"`).
    pub name: String,
    /// Source class.
    pub kind: SourceKind,
    /// Power the source can currently offer (W).
    pub power_available_w: f64,
    /// Hard output ceiling (W).
    pub power_capacity_w: f64,
    /// Energy price (UAH/kWh).
    pub cost_per_kwh: f64,
    /// Physical ramp latency (ms). Informational only.
    pub response_time_ms: u32,
    /// Availability gate: an unavailable source contributes nothing.
    pub is_available: bool,
    /// Reliability metric kept for observability.
    pub uptime_percent: f64,
}

impl EnergySource {
    /// Creates an available source with `power_available_w` equal to its capacity
    /// and 100% uptime.
    pub fn new(name: impl Into<String>, kind: SourceKind, capacity_w: f64, cost_per_kwh: f64) -> Self {
        Self {
            name: name.into(),
            kind,
            power_available_w: capacity_w,
            power_capacity_w: capacity_w,
            cost_per_kwh,
            response_time_ms: 0,
            is_available: true,
            uptime_percent: 100.0,
        }
    }

    /// Power a strategy may draw from this source right now (W).
    ///
    /// Zero when the source is unavailable; otherwise `power_available_w`
    /// clamped to `[0, power_capacity_w]`.
    pub fn offerable_w(&self) -> f64 {
        if !self.is_available {
            return 0.0;
        }
        self.power_available_w.clamp(0.0, self.power_capacity_w.max(0.0))
    }

    /// Checks the static attributes, returning one error per violated constraint.
    pub fn validate(&self) -> Vec<BalanceError> {
        let mut errors = Vec::new();
        let field = |attr: &str| format!("sources.{}.{attr}", self.kind);

        let non_negative = [
            ("power_available_w", self.power_available_w),
            ("power_capacity_w", self.power_capacity_w),
            ("cost_per_kwh", self.cost_per_kwh),
        ];
        for (attr, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                errors.push(BalanceError::config(field(attr), "must be finite and >= 0"));
            }
        }
        if !(0.0..=100.0).contains(&self.uptime_percent) {
            errors.push(BalanceError::config(
                field("uptime_percent"),
                "must be in [0.0, 100.0]",
            ));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_source_offers_nothing() {
        let mut src = EnergySource::new("grid", SourceKind::Grid, 3000.0, 3.5);
        src.is_available = false;
        assert_eq!(src.offerable_w(), 0.0);
    }

    #[test]
    fn available_above_capacity_is_clamped() {
        let mut src = EnergySource::new("battery", SourceKind::Battery, 200.0, 0.05);
        src.power_available_w = 500.0;
        assert_eq!(src.offerable_w(), 200.0);
    }

    #[test]
    fn negative_available_is_floored() {
        let mut src = EnergySource::new("wind", SourceKind::Wind, 100.0, 0.0);
        src.power_available_w = -3.0;
        assert_eq!(src.offerable_w(), 0.0);
    }

    #[test]
    fn validate_flags_negative_cost() {
        let mut src = EnergySource::new("grid", SourceKind::Grid, 3000.0, 3.5);
        src.cost_per_kwh = -1.0;
        let errors = src.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("sources.grid.cost_per_kwh"));
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Solar".parse::<SourceKind>().ok(), Some(SourceKind::Solar));
        assert!("diesel".parse::<SourceKind>().is_err());
    }

    #[test]
    fn only_solar_and_wind_are_renewable() {
        let renewable: Vec<_> = SourceKind::ALL
            .iter()
            .filter(|k| k.is_renewable())
            .collect();
        assert_eq!(renewable, vec![&SourceKind::Solar, &SourceKind::Wind]);
    }
}
