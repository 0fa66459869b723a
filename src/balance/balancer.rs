//! Balancer control loop: refresh, dispatch, stamp, log, summarize.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, Timelike};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{LogInterval, SiteConfig};
use crate::demand::EnergyDemand;
use crate::error::{BalanceError, Result};
use crate::estimators::{
    EstimateContext, Generation, GenerationEstimator, SolarEstimator, WindEstimator,
};
use crate::sources::{BatteryState, SourceKind, SourceRegistry};

use super::allocation::AllocationResult;
use super::rolling_log::{RollingLog, WindowSummary};
use super::strategies::{StrategyInputs, allocate, compare_strategies};
use super::strategy::Strategy;

/// Results included in a dashboard snapshot's `history`.
pub const SNAPSHOT_HISTORY: usize = 30;

/// Default rolling-log retention.
pub const DEFAULT_HISTORY_LEN: usize = 60;

/// Tracks when the next aggregate summary is due.
#[derive(Debug, Clone)]
struct SummaryCadence {
    interval: LogInterval,
    since_last: usize,
    last_emit: Instant,
}

impl SummaryCadence {
    fn new(interval: LogInterval) -> Self {
        Self {
            interval,
            since_last: 0,
            last_emit: Instant::now(),
        }
    }

    fn tick(&mut self) {
        self.since_last += 1;
    }

    fn is_due(&self) -> bool {
        match self.interval {
            LogInterval::Count(n) => self.since_last >= n.max(1),
            LogInterval::Seconds(s) => {
                self.since_last > 0 && self.last_emit.elapsed() >= Duration::from_secs(s)
            }
        }
    }

    /// Resets the window and returns how many allocations it covered.
    fn reset(&mut self) -> usize {
        let window = self.since_last;
        self.since_last = 0;
        self.last_emit = Instant::now();
        window
    }
}

/// Whether the balancer has produced anything yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    Collecting,
    Running,
}

/// JSON document polled by the external dashboard collector.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub status: SnapshotStatus,
    /// Most recent allocation.
    pub current: Option<AllocationResult>,
    /// Up to [`SNAPSHOT_HISTORY`] most recent allocations, oldest first.
    pub history: Vec<AllocationResult>,
    pub last_update: Option<DateTime<Local>>,
    pub last_summary: Option<WindowSummary>,
}

/// Owns the source registry, estimators, battery state, and rolling log, and
/// runs one strategy per [`Balancer::balance`] call.
///
/// The active strategy can only change between calls.
#[derive(Debug)]
pub struct Balancer {
    strategy: Strategy,
    registry: SourceRegistry,
    solar: Box<dyn GenerationEstimator>,
    wind: Box<dyn GenerationEstimator>,
    battery: BatteryState,
    /// Renewables switched off by telemetry; their estimators are not sampled.
    disabled: BTreeSet<SourceKind>,
    default_demand: EnergyDemand,
    cycle_hours: f64,
    log: RollingLog,
    cadence: SummaryCadence,
    last_summary: Option<WindowSummary>,
}

impl Balancer {
    /// Creates a balancer with the default demand, a one-minute cycle, 60
    /// retained results, and a summary every 60 allocations.
    ///
    /// The battery source's available power is re-derived from `battery`
    /// straight away.
    pub fn new(
        strategy: Strategy,
        registry: SourceRegistry,
        battery: BatteryState,
        solar: Box<dyn GenerationEstimator>,
        wind: Box<dyn GenerationEstimator>,
    ) -> Self {
        let mut balancer = Self {
            strategy,
            registry,
            solar,
            wind,
            battery,
            disabled: BTreeSet::new(),
            default_demand: EnergyDemand::default(),
            cycle_hours: 1.0 / 60.0,
            log: RollingLog::new(DEFAULT_HISTORY_LEN),
            cadence: SummaryCadence::new(LogInterval::Count(DEFAULT_HISTORY_LEN)),
            last_summary: None,
        };
        balancer.sync_battery_source();
        balancer
    }

    /// Builds a balancer from a validated site configuration.
    ///
    /// # Errors
    ///
    /// Returns the first `Configuration` error found by
    /// [`SiteConfig::validate`], or any error from building the parts.
    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        if let Some(err) = config.validate().into_iter().next() {
            return Err(err);
        }
        let registry = SourceRegistry::new(config.energy_sources())?;
        let max_discharge_w = registry.get(SourceKind::Battery).power_available_w;
        let battery = BatteryState::new(
            config.battery.capacity_wh,
            config.battery.initial_soc,
            max_discharge_w,
            config.battery.eta_discharge,
        )?;
        let solar = SolarEstimator::new(
            config.solar.capacity_w,
            config.solar.sunrise_hour,
            config.solar.sunset_hour,
        )?;
        let wind = WindEstimator::new(
            config.wind.mean_w,
            config.wind.std_dev_w,
            config.balancer.seed,
        )?;

        Ok(Self::new(
            config.strategy()?,
            registry,
            battery,
            Box::new(solar),
            Box::new(wind),
        )
        .with_default_demand(config.demand())
        .with_cycle_hours(config.cycle_hours())?
        .with_history_len(config.balancer.history_len)
        .with_log_interval(config.balancer.log_interval))
    }

    /// Replaces the demand used when `balance` is called without one.
    pub fn with_default_demand(mut self, demand: EnergyDemand) -> Self {
        self.default_demand = demand;
        self
    }

    /// Sets the wall time one allocation represents (hours).
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error unless `cycle_hours` is finite and > 0.
    pub fn with_cycle_hours(mut self, cycle_hours: f64) -> Result<Self> {
        if !(cycle_hours > 0.0 && cycle_hours.is_finite()) {
            return Err(BalanceError::config(
                "balancer.cycle_minutes",
                format!("cycle length must be finite and > 0, got {cycle_hours} h"),
            ));
        }
        self.cycle_hours = cycle_hours;
        self.sync_battery_source();
        Ok(self)
    }

    /// Sets the rolling-log retention (minimum 1). Clears the log.
    pub fn with_history_len(mut self, history_len: usize) -> Self {
        self.log = RollingLog::new(history_len);
        self
    }

    pub fn with_log_interval(mut self, interval: LogInterval) -> Self {
        self.cadence = SummaryCadence::new(interval);
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Switches the strategy used by subsequent calls.
    pub fn set_strategy(&mut self, strategy: Strategy) {
        if strategy != self.strategy {
            info!(from = %self.strategy, to = %strategy, "strategy changed");
        }
        self.strategy = strategy;
    }

    /// Switches strategy by identifier.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error for an unknown identifier; the current
    /// strategy is left unchanged.
    pub fn set_strategy_by_name(&mut self, name: &str) -> Result<()> {
        let strategy = name.parse()?;
        self.set_strategy(strategy);
        Ok(())
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn battery(&self) -> &BatteryState {
        &self.battery
    }

    pub fn default_demand(&self) -> &EnergyDemand {
        &self.default_demand
    }

    pub fn cycle_hours(&self) -> f64 {
        self.cycle_hours
    }

    pub fn log(&self) -> &RollingLog {
        &self.log
    }

    /// Summary emitted at the last cadence boundary.
    pub fn last_summary(&self) -> Option<&WindowSummary> {
        self.last_summary.as_ref()
    }

    /// Applies a live telemetry reading to one source.
    ///
    /// For the battery this also sets the discharge limit; the figure the
    /// strategies see is then capped by stored energy.
    ///
    /// For solar and wind the reading holds until the next allocation
    /// re-samples the estimator. `is_available = false` switches the source
    /// off for every following allocation (0 W, estimator not sampled) until
    /// a later update marks it available again.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error if `available_w` is negative or not finite.
    pub fn update_source(
        &mut self,
        kind: SourceKind,
        available_w: f64,
        is_available: bool,
    ) -> Result<()> {
        let stored = self.registry.set_available(kind, available_w, is_available)?;
        debug!(source = %kind, available_w = stored, is_available, "source updated");
        match kind {
            SourceKind::Battery => {
                self.battery.max_discharge_w = stored;
                self.sync_battery_source();
            }
            SourceKind::Solar | SourceKind::Wind => {
                if is_available {
                    self.disabled.remove(&kind);
                } else if self.disabled.insert(kind) {
                    info!(source = %kind, "source disabled by telemetry");
                }
            }
            SourceKind::Grid => {}
        }
        Ok(())
    }

    /// Adds energy to the battery from an external charger feed.
    ///
    /// Returns the energy actually stored (Wh).
    pub fn recharge_battery(&mut self, energy_wh: f64) -> f64 {
        let stored = self.battery.recharge(energy_wh);
        self.sync_battery_source();
        debug!(stored_wh = stored, soc = self.battery.soc(), "battery recharged");
        stored
    }

    /// Runs the active strategy for the current hour.
    ///
    /// `None` uses the default demand.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error for negative or inconsistent demand figures.
    pub fn balance(&mut self, demand: Option<&EnergyDemand>) -> Result<AllocationResult> {
        self.balance_at(demand, None)
    }

    /// Runs the active strategy with an optional hour-of-day override.
    ///
    /// Samples both estimators, refreshes the registry, allocates, stamps the
    /// result, drains the battery by what was drawn, and appends to the
    /// rolling log. Emits the aggregate summary when the log interval is due.
    /// Estimator failures count as 0 W and are listed on the result.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error for invalid demand or an hour outside 0..=23.
    /// Nothing is sampled or logged on error.
    pub fn balance_at(
        &mut self,
        demand: Option<&EnergyDemand>,
        hour: Option<u32>,
    ) -> Result<AllocationResult> {
        let hour = resolve_hour(hour)?;
        let demand = demand.unwrap_or(&self.default_demand).clone();
        demand.validate()?;

        let (generation, estimation_errors) = self.refresh_generation(hour);
        let inputs = StrategyInputs {
            registry: &self.registry,
            generation,
            battery: &self.battery,
            cycle_hours: self.cycle_hours,
        };
        let allocation = allocate(self.strategy, &demand, &inputs)?;
        let battery_w = allocation.allocated_w(SourceKind::Battery);
        let result = AllocationResult::stamp(
            allocation,
            Local::now(),
            demand.target_w(),
            hour,
            estimation_errors,
        );

        self.battery.discharge(battery_w, self.cycle_hours);
        self.sync_battery_source();

        debug!(
            strategy = %result.strategy,
            hour,
            demand_w = result.demand_w,
            deficit_w = result.deficit_w,
            "allocation complete"
        );
        if !result.is_fully_served() {
            warn!(
                strategy = %result.strategy,
                deficit_w = result.deficit_w,
                "demand not fully served"
            );
        }

        self.record(result.clone());
        Ok(result)
    }

    /// Runs every strategy over one shared generation sample without
    /// draining the battery or touching the log.
    ///
    /// # Errors
    ///
    /// Same as [`Balancer::balance_at`].
    pub fn compare(
        &mut self,
        demand: Option<&EnergyDemand>,
        hour: Option<u32>,
    ) -> Result<Vec<AllocationResult>> {
        let hour = resolve_hour(hour)?;
        let demand = demand.unwrap_or(&self.default_demand).clone();
        demand.validate()?;

        let (generation, estimation_errors) = self.refresh_generation(hour);
        let inputs = StrategyInputs {
            registry: &self.registry,
            generation,
            battery: &self.battery,
            cycle_hours: self.cycle_hours,
        };
        let now = Local::now();
        let results = compare_strategies(&demand, &inputs)?
            .into_iter()
            .map(|alloc| {
                AllocationResult::stamp(
                    alloc,
                    now,
                    demand.target_w(),
                    hour,
                    estimation_errors.clone(),
                )
            })
            .collect();
        Ok(results)
    }

    /// Current state for the dashboard collector.
    pub fn snapshot(&self) -> DashboardSnapshot {
        let current = self.log.latest().cloned();
        DashboardSnapshot {
            status: if current.is_some() {
                SnapshotStatus::Running
            } else {
                SnapshotStatus::Collecting
            },
            last_update: current.as_ref().map(|r| r.timestamp),
            current,
            history: self.log.recent(SNAPSHOT_HISTORY).cloned().collect(),
            last_summary: self.last_summary.clone(),
        }
    }

    /// [`Balancer::snapshot`] rendered as JSON.
    ///
    /// # Errors
    ///
    /// Returns a `Json` error if serialization fails.
    pub fn snapshot_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }

    /// Samples both estimators and writes the clamped figures into the registry.
    fn refresh_generation(&mut self, hour: u32) -> (Generation, Vec<String>) {
        let context = EstimateContext::new(hour);
        let mut errors = Vec::new();
        let solar_w = self.sample(SourceKind::Solar, &context, &mut errors);
        let wind_w = self.sample(SourceKind::Wind, &context, &mut errors);
        (Generation::new(solar_w, wind_w), errors)
    }

    fn sample(
        &mut self,
        kind: SourceKind,
        context: &EstimateContext,
        errors: &mut Vec<String>,
    ) -> f64 {
        if self.disabled.contains(&kind) {
            if let Err(e) = self.registry.set_available(kind, 0.0, false) {
                warn!(source = %kind, error = %e, "registry rejected disabled source");
            }
            return 0.0;
        }
        let estimator = match kind {
            SourceKind::Solar => &mut self.solar,
            SourceKind::Wind => &mut self.wind,
            SourceKind::Grid | SourceKind::Battery => return 0.0,
        };
        let estimator_type = estimator.estimator_type();
        let raw = estimator.estimate_w(context).and_then(|w| {
            if w.is_finite() {
                Ok(w)
            } else {
                Err(BalanceError::estimation(
                    kind.as_str(),
                    format!("{estimator_type} returned {w}"),
                ))
            }
        });
        let watts = match raw {
            Ok(w) => w.max(0.0),
            Err(e) => {
                warn!(source = %kind, estimator = estimator_type, error = %e, "estimator failed, using 0 W");
                errors.push(format!("{kind}: {e}"));
                0.0
            }
        };
        // Non-negative and finite here, so the registry accepts it.
        match self.registry.set_available(kind, watts, watts > 0.0) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(source = %kind, watts, error = %e, "generation figure rejected by registry, using 0 W");
                0.0
            }
        }
    }

    /// Re-derives the battery source's available power from stored energy.
    fn sync_battery_source(&mut self) {
        let deliverable = self.battery.deliverable_w(self.cycle_hours);
        let is_available = self.registry.get(SourceKind::Battery).is_available;
        if self
            .registry
            .set_available(SourceKind::Battery, deliverable, is_available)
            .is_err()
        {
            warn!(deliverable, "battery figure rejected by registry");
        }
    }

    fn record(&mut self, result: AllocationResult) {
        self.log.push(result);
        self.cadence.tick();
        if !self.cadence.is_due() {
            return;
        }
        let window = self.cadence.reset().min(self.log.len());
        let summary = self.log.summarize_recent(window);
        info!(
            strategy = %self.strategy,
            allocations = summary.allocations,
            grid_w = summary.grid_w,
            renewable_w = summary.renewable_w,
            battery_w = summary.battery_w,
            deficit_w = summary.deficit_w,
            "allocation window summary"
        );
        self.last_summary = Some(summary);
    }
}

fn resolve_hour(hour: Option<u32>) -> Result<u32> {
    match hour {
        Some(h) if h > 23 => Err(BalanceError::Validation(format!(
            "hour must be in 0..=23, got {h}"
        ))),
        Some(h) => Ok(h),
        None => Ok(Local::now().hour()),
    }
}

/// A [`Balancer`] behind one lock, for periodic schedulers on other threads.
///
/// Each call holds the lock for its whole duration, so registry refresh,
/// allocation, and log append never interleave.
#[derive(Debug, Clone)]
pub struct SharedBalancer {
    inner: Arc<Mutex<Balancer>>,
}

impl SharedBalancer {
    pub fn new(balancer: Balancer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(balancer)),
        }
    }

    /// See [`Balancer::balance`].
    ///
    /// # Errors
    ///
    /// Same as [`Balancer::balance`].
    pub fn balance(&self, demand: Option<&EnergyDemand>) -> Result<AllocationResult> {
        self.inner.lock().balance(demand)
    }

    /// See [`Balancer::balance_at`].
    ///
    /// # Errors
    ///
    /// Same as [`Balancer::balance_at`].
    pub fn balance_at(
        &self,
        demand: Option<&EnergyDemand>,
        hour: Option<u32>,
    ) -> Result<AllocationResult> {
        self.inner.lock().balance_at(demand, hour)
    }

    /// See [`Balancer::set_strategy_by_name`].
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error for an unknown identifier.
    pub fn set_strategy_by_name(&self, name: &str) -> Result<()> {
        self.inner.lock().set_strategy_by_name(name)
    }

    /// See [`Balancer::update_source`].
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error if `available_w` is negative or not finite.
    pub fn update_source(&self, kind: SourceKind, available_w: f64, is_available: bool) -> Result<()> {
        self.inner.lock().update_source(kind, available_w, is_available)
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.inner.lock().snapshot()
    }

    /// Runs `f` with exclusive access.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut Balancer) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::FixedEstimator;
    use crate::sources::EnergySource;

    fn registry() -> SourceRegistry {
        let mut grid = EnergySource::new("grid", SourceKind::Grid, 3000.0, 3.5);
        grid.power_available_w = 2500.0;
        let mut battery = EnergySource::new("battery", SourceKind::Battery, 200.0, 0.05);
        battery.power_available_w = 150.0;
        SourceRegistry::new(vec![
            grid,
            EnergySource::new("solar", SourceKind::Solar, 600.0, 0.0),
            EnergySource::new("wind", SourceKind::Wind, 100.0, 0.0),
            battery,
        ])
        .expect("valid registry")
    }

    fn balancer(strategy: Strategy, solar_w: f64, wind_w: f64) -> Balancer {
        let battery = BatteryState::new(50.0, 0.9, 150.0, 1.0).expect("valid battery");
        Balancer::new(
            strategy,
            registry(),
            battery,
            Box::new(FixedEstimator::new(solar_w)),
            Box::new(FixedEstimator::new(wind_w)),
        )
    }

    #[test]
    fn balance_appends_to_log() {
        let mut b = balancer(Strategy::GridPriority, 0.0, 0.0);
        let result = b.balance_at(None, Some(12)).expect("balance");
        assert_eq!(result.demand_w, 480.0);
        assert_eq!(result.hour, 12);
        assert_eq!(b.log().len(), 1);
        assert_eq!(b.log().latest(), Some(&result));
    }

    #[test]
    fn invalid_hour_is_validation_error() {
        let mut b = balancer(Strategy::GridPriority, 0.0, 0.0);
        let err = b.balance_at(None, Some(24)).expect_err("hour 24 invalid");
        assert!(err.is_validation());
        assert!(b.log().is_empty());
    }

    #[test]
    fn negative_demand_rejected_before_logging() {
        let mut b = balancer(Strategy::RenewableFirst, 0.0, 0.0);
        let demand = EnergyDemand::flat(-5.0, 50.0);
        let err = b.balance_at(Some(&demand), Some(12)).expect_err("negative");
        assert!(err.is_validation());
        assert!(b.log().is_empty());
    }

    #[test]
    fn unknown_strategy_name_keeps_current() {
        let mut b = balancer(Strategy::OffGrid, 0.0, 0.0);
        let err = b.set_strategy_by_name("CHEAPEST").expect_err("unknown");
        assert!(err.is_configuration());
        assert_eq!(b.strategy(), Strategy::OffGrid);
        b.set_strategy_by_name("GRID_PRIORITY").expect("known");
        assert_eq!(b.strategy(), Strategy::GridPriority);
    }

    #[test]
    fn generation_refresh_writes_registry() {
        let mut b = balancer(Strategy::RenewableFirst, 900.0, 0.0);
        b.balance_at(None, Some(12)).expect("balance");
        let solar = b.registry().get(SourceKind::Solar);
        assert_eq!(solar.power_available_w, 600.0);
        assert!(solar.is_available);
        let wind = b.registry().get(SourceKind::Wind);
        assert_eq!(wind.power_available_w, 0.0);
        assert!(!wind.is_available);
    }

    #[test]
    fn failing_estimator_counts_as_zero() {
        let mut b = balancer(Strategy::RenewableFirst, f64::NAN, 40.0);
        let result = b.balance_at(None, Some(12)).expect("balance");
        assert_eq!(result.allocated_w(SourceKind::Solar), 0.0);
        assert_eq!(result.estimation_errors.len(), 1);
        assert!(result.estimation_errors[0].starts_with("solar"));
        let total = result.total_allocated_w() + result.deficit_w;
        assert!((total - 480.0).abs() < 1e-9);
    }

    #[test]
    fn battery_drains_across_calls() {
        let mut b = balancer(Strategy::OffGrid, 0.0, 0.0).with_cycle_hours(0.1)
            .expect("valid cycle");
        let before = b.battery().remaining_wh();
        let first = b.balance_at(None, Some(0)).expect("balance");
        assert_eq!(first.allocated_w(SourceKind::Battery), 150.0);
        let after = b.battery().remaining_wh();
        assert!((before - after - 15.0).abs() < 1e-9);
        assert_eq!(first.battery_remaining_wh().map(|wh| (wh - after).abs() < 1e-9), Some(true));

        // 30 Wh left; over 0.1 h the pack can still sustain 150 W twice.
        b.balance_at(None, Some(0)).expect("balance");
        b.balance_at(None, Some(0)).expect("balance");
        assert!(b.battery().remaining_wh() < 1e-9);
        assert!(b.registry().offerable_w(SourceKind::Battery) < 1e-6);

        let empty = b.balance_at(None, Some(0)).expect("balance");
        assert_eq!(empty.allocated_w(SourceKind::Battery), 0.0);
        assert_eq!(empty.emergency_grid_used(), Some(true));
        assert!((empty.allocated_w(SourceKind::Grid) - 480.0).abs() < 1e-9);
    }

    #[test]
    fn recharge_restores_battery_figure() {
        let mut b = balancer(Strategy::OffGrid, 0.0, 0.0).with_cycle_hours(1.0)
            .expect("valid cycle");
        // 45 Wh over a one-hour cycle caps delivery at 45 W.
        assert!((b.registry().offerable_w(SourceKind::Battery) - 45.0).abs() < 1e-9);
        let stored = b.recharge_battery(100.0);
        assert!((stored - 5.0).abs() < 1e-9);
        assert!((b.registry().offerable_w(SourceKind::Battery) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn update_source_clamps_and_validates() {
        let mut b = balancer(Strategy::GridPriority, 0.0, 0.0);
        b.update_source(SourceKind::Grid, 5000.0, true).expect("valid");
        assert_eq!(b.registry().get(SourceKind::Grid).power_available_w, 3000.0);
        let err = b
            .update_source(SourceKind::Grid, -1.0, true)
            .expect_err("negative");
        assert!(err.is_validation());
        b.update_source(SourceKind::Battery, 100.0, true).expect("valid");
        assert_eq!(b.battery().max_discharge_w, 100.0);
        assert_eq!(b.registry().offerable_w(SourceKind::Battery), 100.0);
    }

    #[test]
    fn invalid_cycle_length_is_rejected() {
        for hours in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = balancer(Strategy::OffGrid, 0.0, 0.0)
                .with_cycle_hours(hours)
                .expect_err("cycle length must be positive");
            assert!(err.is_configuration());
        }
    }

    #[test]
    fn disabled_renewable_stays_off() {
        let mut b = balancer(Strategy::RenewableFirst, 600.0, 0.0);
        b.update_source(SourceKind::Solar, 0.0, false).expect("valid");
        let result = b.balance_at(None, Some(12)).expect("balance");
        assert_eq!(result.allocated_w(SourceKind::Solar), 0.0);
        let solar = b.registry().get(SourceKind::Solar);
        assert!(!solar.is_available);
        assert_eq!(solar.power_available_w, 0.0);

        b.update_source(SourceKind::Solar, 0.0, true).expect("valid");
        let result = b.balance_at(None, Some(12)).expect("balance");
        assert!((result.allocated_w(SourceKind::Solar) - 384.0).abs() < 1e-9);
        assert!(b.registry().get(SourceKind::Solar).is_available);
    }

    #[test]
    fn count_cadence_summarizes_window() {
        let mut b = balancer(Strategy::GridPriority, 0.0, 0.0)
            .with_log_interval(LogInterval::Count(3));
        b.balance_at(None, Some(12)).expect("balance");
        b.balance_at(None, Some(12)).expect("balance");
        assert!(b.last_summary().is_none());
        b.balance_at(None, Some(12)).expect("balance");
        let summary = b.last_summary().cloned().expect("summary after 3");
        assert_eq!(summary.allocations, 3);
        assert!((summary.grid_w - 3.0 * 480.0).abs() < 1e-9);

        b.balance_at(None, Some(12)).expect("balance");
        assert_eq!(b.last_summary().map(|s| s.allocations), Some(3));
    }

    #[test]
    fn seconds_cadence_zero_summarizes_every_call() {
        let mut b = balancer(Strategy::GridPriority, 0.0, 0.0)
            .with_log_interval(LogInterval::Seconds(0));
        b.balance_at(None, Some(12)).expect("balance");
        assert_eq!(b.last_summary().map(|s| s.allocations), Some(1));
        b.balance_at(None, Some(12)).expect("balance");
        assert_eq!(b.last_summary().map(|s| s.allocations), Some(1));
    }

    #[test]
    fn seconds_cadence_waits_for_interval() {
        let mut b = balancer(Strategy::GridPriority, 0.0, 0.0)
            .with_log_interval(LogInterval::Seconds(3600));
        for _ in 0..5 {
            b.balance_at(None, Some(12)).expect("balance");
        }
        assert!(b.last_summary().is_none());
    }

    #[test]
    fn snapshot_status_transitions() {
        let mut b = balancer(Strategy::RenewableFirst, 300.0, 30.0);
        let empty = b.snapshot();
        assert_eq!(empty.status, SnapshotStatus::Collecting);
        assert!(empty.current.is_none());
        assert!(empty.last_update.is_none());

        for _ in 0..40 {
            b.balance_at(None, Some(12)).expect("balance");
        }
        let snap = b.snapshot();
        assert_eq!(snap.status, SnapshotStatus::Running);
        assert_eq!(snap.history.len(), SNAPSHOT_HISTORY);
        assert_eq!(snap.current.as_ref(), snap.history.last());

        let json: serde_json::Value =
            serde_json::from_str(&b.snapshot_json().expect("json")).expect("parse");
        assert_eq!(json["status"], "running");
        assert_eq!(json["current"]["strategy"], "RENEWABLE_FIRST");
    }

    #[test]
    fn compare_leaves_state_untouched() {
        let mut b = balancer(Strategy::GridPriority, 200.0, 50.0);
        let soc = b.battery().soc();
        let results = b.compare(None, Some(12)).expect("compare");
        let strategies: Vec<Strategy> = results.iter().map(|r| r.strategy).collect();
        assert_eq!(strategies, Strategy::ALL.to_vec());
        assert!(b.log().is_empty());
        assert_eq!(b.battery().soc(), soc);
    }

    #[test]
    fn shared_balancer_serializes_calls() {
        let shared = SharedBalancer::new(balancer(Strategy::GridPriority, 0.0, 0.0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let s = shared.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        s.balance_at(None, Some(12)).expect("balance");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread");
        }
        assert_eq!(shared.with_lock(|b| b.log().len()), 40);
    }

    #[test]
    fn from_config_uses_reference_battery() {
        let b = Balancer::from_config(&SiteConfig::baseline()).expect("baseline");
        assert!((b.battery().remaining_wh() - 45.0).abs() < 1e-9);
        assert_eq!(b.registry().offerable_w(SourceKind::Battery), 150.0);
        assert_eq!(b.strategy(), Strategy::RenewableFirst);
    }

    #[test]
    fn from_config_rejects_unknown_strategy() {
        let mut cfg = SiteConfig::baseline();
        cfg.balancer.strategy = "BOGUS".to_string();
        let err = Balancer::from_config(&cfg).expect_err("unknown");
        assert!(err.is_configuration());
    }
}
