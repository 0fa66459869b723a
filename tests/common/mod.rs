//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use hybrid_balancer::balance::{Balancer, Strategy, StrategyInputs};
use hybrid_balancer::estimators::{FixedEstimator, Generation};
use hybrid_balancer::sources::{BatteryState, EnergySource, SourceKind, SourceRegistry};

/// Numerical tolerance for conservation checks (W).
pub const EPS: f64 = 1e-6;

/// One-minute allocation cycle in hours.
pub const ONE_MINUTE_H: f64 = 1.0 / 60.0;

/// Reference registry with the given live grid and battery figures.
///
/// Grid 3000 W capacity at 3.5 UAH/kWh, solar 600 W, wind 100 W, battery
/// 200 W capacity at 0.05 UAH/kWh.
pub fn registry(grid_w: f64, battery_w: f64) -> SourceRegistry {
    let mut grid = EnergySource::new("Main Grid", SourceKind::Grid, 3000.0, 3.5);
    grid.power_available_w = grid_w;
    let mut battery = EnergySource::new("Battery", SourceKind::Battery, 200.0, 0.05);
    battery.power_available_w = battery_w;
    SourceRegistry::new(vec![
        grid,
        EnergySource::new("Solar", SourceKind::Solar, 600.0, 0.0),
        EnergySource::new("Wind", SourceKind::Wind, 100.0, 0.0),
        battery,
    ])
    .expect("fixture registry is valid")
}

/// Reference registry with the grid switched off.
pub fn registry_grid_down(battery_w: f64) -> SourceRegistry {
    let mut reg = registry(0.0, battery_w);
    reg.set_available(SourceKind::Grid, 0.0, false)
        .expect("zero is a valid reading");
    reg
}

/// Reference battery: 50 Wh at 90% charge.
pub fn battery() -> BatteryState {
    BatteryState::new(50.0, 0.9, 150.0, 1.0).expect("fixture battery is valid")
}

/// Strategy inputs over a registry and a fixed generation sample.
pub fn inputs<'a>(
    registry: &'a SourceRegistry,
    battery: &'a BatteryState,
    solar_w: f64,
    wind_w: f64,
) -> StrategyInputs<'a> {
    StrategyInputs {
        registry,
        generation: Generation::new(solar_w, wind_w),
        battery,
        cycle_hours: ONE_MINUTE_H,
    }
}

/// Balancer over the reference registry with fixed solar and wind readings.
pub fn fixed_balancer(strategy: Strategy, solar_w: f64, wind_w: f64) -> Balancer {
    Balancer::new(
        strategy,
        registry(2500.0, 150.0),
        battery(),
        Box::new(FixedEstimator::new(solar_w)),
        Box::new(FixedEstimator::new(wind_w)),
    )
}
