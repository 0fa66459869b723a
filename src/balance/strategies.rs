//! The three waterfall allocation policies.
//!
//! Each strategy greedily subtracts source output from the remaining demand in
//! a fixed priority order. Firm sources (grid, battery) are read from the
//! registry; solar and wind are read from the [`Generation`] snapshot sampled
//! for this cycle. No strategy searches for a cheaper mix and none mutates its
//! inputs.

use crate::demand::EnergyDemand;
use crate::error::Result;
use crate::estimators::Generation;
use crate::sources::{BatteryState, SourceKind, SourceRegistry};

use super::allocation::{Allocation, StrategyMetrics, Waterfall};
use super::strategy::Strategy;

/// GRID_PRIORITY: solar/wind share of the demand left after grid and battery.
const GRID_PRIORITY_SOLAR_SHARE: f64 = 0.7;
const GRID_PRIORITY_WIND_SHARE: f64 = 0.3;
/// RENEWABLE_FIRST: fraction of the remainder each renewable may cover.
const RENEWABLE_FIRST_SOLAR_SHARE: f64 = 0.8;
const RENEWABLE_FIRST_WIND_SHARE: f64 = 0.8;
/// OFF_GRID: fraction of the remainder each renewable may cover.
const OFF_GRID_SOLAR_SHARE: f64 = 0.7;
const OFF_GRID_WIND_SHARE: f64 = 0.3;

/// Read-only view of everything a strategy consumes besides the demand.
#[derive(Debug, Clone, Copy)]
pub struct StrategyInputs<'a> {
    pub registry: &'a SourceRegistry,
    pub generation: Generation,
    pub battery: &'a BatteryState,
    /// Wall time one allocation represents, in hours.
    pub cycle_hours: f64,
}

/// Runs `strategy` against `demand`.
///
/// # Errors
///
/// Returns a `Validation` error if the demand figures are negative or inconsistent.
pub fn allocate(
    strategy: Strategy,
    demand: &EnergyDemand,
    inputs: &StrategyInputs<'_>,
) -> Result<Allocation> {
    demand.validate()?;
    let allocation = match strategy {
        Strategy::GridPriority => grid_priority(demand, inputs),
        Strategy::RenewableFirst => renewable_first(demand, inputs),
        Strategy::OffGrid => off_grid(demand, inputs),
    };
    Ok(allocation)
}

/// Runs every strategy over the same inputs, in [`Strategy::ALL`] order.
///
/// # Errors
///
/// Returns a `Validation` error if the demand figures are negative or inconsistent.
pub fn compare_strategies(
    demand: &EnergyDemand,
    inputs: &StrategyInputs<'_>,
) -> Result<Vec<Allocation>> {
    Strategy::ALL
        .into_iter()
        .map(|strategy| allocate(strategy, demand, inputs))
        .collect()
}

fn grid_priority(demand: &EnergyDemand, inputs: &StrategyInputs<'_>) -> Allocation {
    let registry = inputs.registry;
    let mut wf = Waterfall::new(demand.target_w());

    wf.draw(SourceKind::Grid, registry.offerable_w(SourceKind::Grid));
    wf.draw(SourceKind::Battery, registry.offerable_w(SourceKind::Battery));

    // Both renewables split the same remainder.
    if wf.has_remaining() {
        let remaining = wf.remaining_w();
        wf.draw(
            SourceKind::Solar,
            (remaining * GRID_PRIORITY_SOLAR_SHARE).min(inputs.generation.solar_w),
        );
        wf.draw(
            SourceKind::Wind,
            (remaining * GRID_PRIORITY_WIND_SHARE).min(inputs.generation.wind_w),
        );
    }

    let grid_w = wf.drawn(SourceKind::Grid);
    let cost = grid_w / 1000.0 * registry.get(SourceKind::Grid).cost_per_kwh;
    wf.finish(
        Strategy::GridPriority,
        StrategyMetrics::GridPriority {
            cost_estimate_uah_per_hour: cost,
        },
    )
}

fn renewable_first(demand: &EnergyDemand, inputs: &StrategyInputs<'_>) -> Allocation {
    let registry = inputs.registry;
    let target_w = demand.target_w();
    let mut wf = Waterfall::new(target_w);

    let solar_limit = wf.remaining_w() * RENEWABLE_FIRST_SOLAR_SHARE;
    wf.draw(SourceKind::Solar, solar_limit.min(inputs.generation.solar_w));
    let wind_limit = wf.remaining_w() * RENEWABLE_FIRST_WIND_SHARE;
    wf.draw(SourceKind::Wind, wind_limit.min(inputs.generation.wind_w));

    wf.draw(SourceKind::Battery, registry.offerable_w(SourceKind::Battery));
    wf.draw(SourceKind::Grid, registry.offerable_w(SourceKind::Grid));

    let renewable_w = wf.drawn(SourceKind::Solar) + wf.drawn(SourceKind::Wind);
    let renewable_percent = if demand.total_w > 0.0 && target_w > 0.0 {
        renewable_w / target_w * 100.0
    } else {
        0.0
    };
    wf.finish(
        Strategy::RenewableFirst,
        StrategyMetrics::RenewableFirst { renewable_percent },
    )
}

fn off_grid(demand: &EnergyDemand, inputs: &StrategyInputs<'_>) -> Allocation {
    let registry = inputs.registry;
    let mut wf = Waterfall::new(demand.target_w());

    let battery_w = wf.draw(SourceKind::Battery, registry.offerable_w(SourceKind::Battery));

    let solar_limit = wf.remaining_w() * OFF_GRID_SOLAR_SHARE;
    wf.draw(SourceKind::Solar, solar_limit.min(inputs.generation.solar_w));
    let wind_limit = wf.remaining_w() * OFF_GRID_WIND_SHARE;
    wf.draw(SourceKind::Wind, wind_limit.min(inputs.generation.wind_w));

    // Anything still unmet after battery and renewables is an emergency,
    // whether or not the grid can cover it.
    let emergency_grid_used = wf.has_remaining();
    wf.draw(SourceKind::Grid, registry.offerable_w(SourceKind::Grid));

    let battery_remaining_wh = inputs.battery.remaining_after(battery_w, inputs.cycle_hours);
    wf.finish(
        Strategy::OffGrid,
        StrategyMetrics::OffGrid {
            battery_remaining_wh,
            emergency_grid_used,
        },
    )
}
