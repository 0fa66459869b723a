//! Allocation results and the waterfall accumulator the strategies share.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::sources::SourceKind;

use super::strategy::Strategy;

/// Residual below which demand counts as fully served (W).
///
/// Repeated subtraction across several sources leaves floating-point noise;
/// anything under this is treated as zero.
pub const EPSILON_W: f64 = 1e-9;

/// Greedy accumulator: subtracts each draw from the remaining demand.
#[derive(Debug, Clone)]
pub struct Waterfall {
    target_w: f64,
    remaining_w: f64,
    sources: BTreeMap<SourceKind, f64>,
}

impl Waterfall {
    pub fn new(target_w: f64) -> Self {
        Self {
            target_w,
            remaining_w: target_w.max(0.0),
            sources: BTreeMap::new(),
        }
    }

    pub fn target_w(&self) -> f64 {
        self.target_w
    }

    pub fn remaining_w(&self) -> f64 {
        self.remaining_w
    }

    /// `true` while unmet demand exceeds [`EPSILON_W`].
    pub fn has_remaining(&self) -> bool {
        self.remaining_w > EPSILON_W
    }

    /// Draws up to `limit_w` from `kind` and returns the amount taken.
    ///
    /// Never takes more than what remains; negative limits draw nothing.
    pub fn draw(&mut self, kind: SourceKind, limit_w: f64) -> f64 {
        if !self.has_remaining() {
            return 0.0;
        }
        let amount = self.remaining_w.min(limit_w.max(0.0));
        if amount <= EPSILON_W {
            return 0.0;
        }
        self.remaining_w -= amount;
        *self.sources.entry(kind).or_insert(0.0) += amount;
        amount
    }

    /// Total drawn from `kind` so far (W).
    pub fn drawn(&self, kind: SourceKind) -> f64 {
        self.sources.get(&kind).copied().unwrap_or(0.0)
    }

    /// Closes the waterfall; leftover demand becomes the deficit.
    pub fn finish(self, strategy: Strategy, metrics: StrategyMetrics) -> Allocation {
        let deficit_w = if self.has_remaining() {
            self.remaining_w
        } else {
            0.0
        };
        Allocation {
            strategy,
            sources: self.sources,
            deficit_w,
            metrics,
        }
    }
}

/// Strategy-specific derived figures.
///
/// Serialized flat next to the common fields, using the keys the dashboard
/// collector expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StrategyMetrics {
    GridPriority {
        cost_estimate_uah_per_hour: f64,
    },
    RenewableFirst {
        renewable_percent: f64,
    },
    OffGrid {
        battery_remaining_wh: f64,
        emergency_grid_used: bool,
    },
}

/// Output of a strategy before the balancer stamps it.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub strategy: Strategy,
    pub sources: BTreeMap<SourceKind, f64>,
    pub deficit_w: f64,
    pub metrics: StrategyMetrics,
}

impl Allocation {
    pub fn allocated_w(&self, kind: SourceKind) -> f64 {
        self.sources.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn total_allocated_w(&self) -> f64 {
        self.sources.values().sum()
    }
}

/// Complete, timestamped record of one allocation call.
///
/// Sources absent from `sources` contributed 0 W.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationResult {
    pub strategy: Strategy,
    pub sources: BTreeMap<SourceKind, f64>,
    pub deficit_w: f64,
    #[serde(flatten)]
    pub metrics: StrategyMetrics,
    pub timestamp: DateTime<Local>,
    /// Requested total: components plus safety margin (W).
    pub demand_w: f64,
    /// Hour of day the generation estimates were taken for.
    pub hour: u32,
    /// Estimators that failed this cycle; their sources counted as 0 W.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub estimation_errors: Vec<String>,
}

impl AllocationResult {
    /// Stamps a strategy output with time and demand.
    pub fn stamp(
        allocation: Allocation,
        timestamp: DateTime<Local>,
        demand_w: f64,
        hour: u32,
        estimation_errors: Vec<String>,
    ) -> Self {
        Self {
            strategy: allocation.strategy,
            sources: allocation.sources,
            deficit_w: allocation.deficit_w,
            metrics: allocation.metrics,
            timestamp,
            demand_w,
            hour,
            estimation_errors,
        }
    }

    pub fn allocated_w(&self, kind: SourceKind) -> f64 {
        self.sources.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn total_allocated_w(&self) -> f64 {
        self.sources.values().sum()
    }

    /// Solar plus wind (W).
    pub fn renewable_w(&self) -> f64 {
        self.allocated_w(SourceKind::Solar) + self.allocated_w(SourceKind::Wind)
    }

    pub fn is_fully_served(&self) -> bool {
        self.deficit_w <= EPSILON_W
    }

    pub fn cost_estimate_uah_per_hour(&self) -> Option<f64> {
        match self.metrics {
            StrategyMetrics::GridPriority {
                cost_estimate_uah_per_hour,
            } => Some(cost_estimate_uah_per_hour),
            _ => None,
        }
    }

    pub fn renewable_percent(&self) -> Option<f64> {
        match self.metrics {
            StrategyMetrics::RenewableFirst { renewable_percent } => Some(renewable_percent),
            _ => None,
        }
    }

    pub fn emergency_grid_used(&self) -> Option<bool> {
        match self.metrics {
            StrategyMetrics::OffGrid {
                emergency_grid_used,
                ..
            } => Some(emergency_grid_used),
            _ => None,
        }
    }

    pub fn battery_remaining_wh(&self) -> Option<f64> {
        match self.metrics {
            StrategyMetrics::OffGrid {
                battery_remaining_wh,
                ..
            } => Some(battery_remaining_wh),
            _ => None,
        }
    }
}

impl fmt::Display for AllocationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {:02}h | demand={:.1} W  grid={:.1}  battery={:.1}  solar={:.1}  wind={:.1} | deficit={:.1} W",
            self.strategy,
            self.hour,
            self.demand_w,
            self.allocated_w(SourceKind::Grid),
            self.allocated_w(SourceKind::Battery),
            self.allocated_w(SourceKind::Solar),
            self.allocated_w(SourceKind::Wind),
            self.deficit_w,
        )?;
        match self.metrics {
            StrategyMetrics::GridPriority {
                cost_estimate_uah_per_hour,
            } => write!(f, " | cost={cost_estimate_uah_per_hour:.2} UAH/h"),
            StrategyMetrics::RenewableFirst { renewable_percent } => {
                write!(f, " | renewable={renewable_percent:.1}%")
            }
            StrategyMetrics::OffGrid {
                battery_remaining_wh,
                emergency_grid_used,
            } => write!(
                f,
                " | battery_left={battery_remaining_wh:.1} Wh emergency_grid={emergency_grid_used}"
            ),
        }
    }
}
