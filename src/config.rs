//! TOML-based site configuration and preset definitions.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::balance::strategy::Strategy;
use crate::demand::EnergyDemand;
use crate::error::{BalanceError, Result};
use crate::sources::{EnergySource, SourceKind};

/// Top-level site configuration parsed from TOML.
///
/// All fields have defaults matching the reference site. Load from TOML with
/// [`SiteConfig::from_toml_file`] or use [`SiteConfig::baseline`] for the
/// built-in default. Read once at construction; nothing reloads mid-run.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Strategy selection, logging cadence, and history retention.
    #[serde(default)]
    pub balancer: BalancerConfig,
    /// Solar estimator parameters.
    #[serde(default)]
    pub solar: SolarConfig,
    /// Wind estimator parameters.
    #[serde(default)]
    pub wind: WindConfig,
    /// Battery storage parameters.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// Default demand used when a caller supplies none.
    #[serde(default)]
    pub demand: DemandConfig,
    /// Source registry entries, one per kind.
    #[serde(default = "reference_sources")]
    pub sources: Vec<SourceConfig>,
}

/// How often the balancer emits its aggregate summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogInterval {
    /// Every `n` allocations.
    Count(usize),
    /// Once at least this many seconds have passed since the last summary.
    Seconds(u64),
}

/// Balancer control-loop parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BalancerConfig {
    /// `"GRID_PRIORITY"`, `"RENEWABLE_FIRST"` or `"OFF_GRID"`.
    pub strategy: String,
    /// Summary cadence.
    pub log_interval: LogInterval,
    /// Rolling-log retention (entries, must be > 0).
    pub history_len: usize,
    /// Wall time one allocation represents, for battery bookkeeping (minutes).
    pub cycle_minutes: f64,
    /// Wind estimator random seed.
    pub seed: u64,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::RenewableFirst.as_str().to_string(),
            log_interval: LogInterval::Count(60),
            history_len: 60,
            cycle_minutes: 1.0,
            seed: 42,
        }
    }
}

/// Solar estimator parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolarConfig {
    /// Peak output (W).
    pub capacity_w: f64,
    /// Start of the generation window (hour, exclusive).
    pub sunrise_hour: u32,
    /// End of the generation window (hour, exclusive).
    pub sunset_hour: u32,
}

impl Default for SolarConfig {
    fn default() -> Self {
        Self {
            capacity_w: 600.0,
            sunrise_hour: 6,
            sunset_hour: 18,
        }
    }
}

/// Wind estimator parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindConfig {
    /// Mean output (W).
    pub mean_w: f64,
    /// Standard deviation of output (W).
    pub std_dev_w: f64,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            mean_w: 50.0,
            std_dev_w: 15.0,
        }
    }
}

/// Battery storage parameters.
///
/// The discharge limit comes from the battery source's `power_available_w`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Usable energy capacity (Wh).
    pub capacity_wh: f64,
    /// Initial state of charge (0.0–1.0).
    pub initial_soc: f64,
    /// Discharge efficiency (0.0–1.0].
    pub eta_discharge: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            capacity_wh: 50.0,
            initial_soc: 0.9,
            eta_discharge: 1.0,
        }
    }
}

/// Default demand breakdown.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemandConfig {
    /// Reserve added on top of the components (W).
    pub safety_margin_w: f64,
    /// Named load components (W).
    pub components: BTreeMap<String, f64>,
}

impl Default for DemandConfig {
    fn default() -> Self {
        let demand = EnergyDemand::default();
        Self {
            safety_margin_w: demand.safety_margin_w,
            components: demand
                .components
                .into_iter()
                .map(|c| (c.name, c.power_w))
                .collect(),
        }
    }
}

impl DemandConfig {
    pub fn to_demand(&self) -> EnergyDemand {
        EnergyDemand::new(
            self.components.iter().map(|(name, w)| (name.clone(), *w)),
            self.safety_margin_w,
        )
    }
}

/// One source registry entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub name: String,
    pub power_available_w: f64,
    pub power_capacity_w: f64,
    #[serde(default)]
    pub cost_per_kwh: f64,
    #[serde(default)]
    pub response_time_ms: u32,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default = "default_uptime")]
    pub uptime_percent: f64,
}

fn default_true() -> bool {
    true
}

fn default_uptime() -> f64 {
    100.0
}

impl SourceConfig {
    pub fn to_source(&self) -> EnergySource {
        EnergySource {
            name: self.name.clone(),
            kind: self.kind,
            power_available_w: self.power_available_w,
            power_capacity_w: self.power_capacity_w,
            cost_per_kwh: self.cost_per_kwh,
            response_time_ms: self.response_time_ms,
            is_available: self.is_available,
            uptime_percent: self.uptime_percent,
        }
    }
}

/// Reference site: grid mains, a small PV array, a small turbine, and a
/// LiFePO4 pack.
pub fn reference_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            kind: SourceKind::Grid,
            name: "Main Grid (Kyivstar)".to_string(),
            power_available_w: 2500.0,
            power_capacity_w: 3000.0,
            cost_per_kwh: 3.5,
            response_time_ms: 0,
            is_available: true,
            uptime_percent: 95.2,
        },
        SourceConfig {
            kind: SourceKind::Solar,
            name: "Solar Panels".to_string(),
            power_available_w: 0.0,
            power_capacity_w: 600.0,
            cost_per_kwh: 0.0,
            response_time_ms: 100,
            is_available: false,
            uptime_percent: 99.5,
        },
        SourceConfig {
            kind: SourceKind::Wind,
            name: "Wind Turbine".to_string(),
            power_available_w: 0.0,
            power_capacity_w: 100.0,
            cost_per_kwh: 0.0,
            response_time_ms: 200,
            is_available: false,
            uptime_percent: 99.5,
        },
        SourceConfig {
            kind: SourceKind::Battery,
            name: "LiFePO4 Battery (50Wh)".to_string(),
            power_available_w: 150.0,
            power_capacity_w: 200.0,
            cost_per_kwh: 0.05,
            response_time_ms: 50,
            is_available: true,
            uptime_percent: 99.9,
        },
    ]
}

impl SiteConfig {
    /// Returns the baseline site (reference sources, RENEWABLE_FIRST).
    pub fn baseline() -> Self {
        Self {
            balancer: BalancerConfig::default(),
            solar: SolarConfig::default(),
            wind: WindConfig::default(),
            battery: BatteryConfig::default(),
            demand: DemandConfig::default(),
            sources: reference_sources(),
        }
    }

    /// Returns the off-grid cabin preset: OFF_GRID with a larger, full battery.
    pub fn off_grid_cabin() -> Self {
        let mut sources = reference_sources();
        for s in &mut sources {
            match s.kind {
                SourceKind::Battery => {
                    s.name = "LiFePO4 Battery (200Wh)".to_string();
                    s.power_available_w = 200.0;
                }
                SourceKind::Grid => s.power_available_w = 1000.0,
                SourceKind::Solar | SourceKind::Wind => {}
            }
        }
        Self {
            balancer: BalancerConfig {
                strategy: Strategy::OffGrid.as_str().to_string(),
                ..BalancerConfig::default()
            },
            battery: BatteryConfig {
                capacity_wh: 200.0,
                initial_soc: 1.0,
                ..BatteryConfig::default()
            },
            sources,
            ..Self::baseline()
        }
    }

    /// Returns the grid-backup preset: GRID_PRIORITY on a derated mains feed.
    pub fn grid_backup() -> Self {
        let mut sources = reference_sources();
        for s in &mut sources {
            if s.kind == SourceKind::Grid {
                s.power_available_w = 300.0;
            }
        }
        Self {
            balancer: BalancerConfig {
                strategy: Strategy::GridPriority.as_str().to_string(),
                ..BalancerConfig::default()
            },
            sources,
            ..Self::baseline()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "off_grid_cabin", "grid_backup"];

    /// Loads a site from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "off_grid_cabin" => Ok(Self::off_grid_cabin()),
            "grid_backup" => Ok(Self::grid_backup()),
            _ => Err(BalanceError::config(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a site from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            BalanceError::config("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a site from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| BalanceError::config("toml", e.to_string()))
    }

    /// Parsed strategy selection.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error for an unknown identifier.
    pub fn strategy(&self) -> Result<Strategy> {
        self.balancer.strategy.parse()
    }

    /// Default demand built from the `[demand]` section.
    pub fn demand(&self) -> EnergyDemand {
        self.demand.to_demand()
    }

    /// Registry entries converted to sources.
    pub fn energy_sources(&self) -> Vec<EnergySource> {
        self.sources.iter().map(SourceConfig::to_source).collect()
    }

    /// Cycle length in hours.
    pub fn cycle_hours(&self) -> f64 {
        self.balancer.cycle_minutes / 60.0
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<BalanceError> {
        let mut errors = Vec::new();
        let b = &self.balancer;

        if let Err(e) = self.strategy() {
            errors.push(e);
        }
        if b.history_len == 0 {
            errors.push(BalanceError::config("balancer.history_len", "must be > 0"));
        }
        if b.log_interval == LogInterval::Count(0) {
            errors.push(BalanceError::config(
                "balancer.log_interval",
                "count must be > 0",
            ));
        }
        if !(b.cycle_minutes > 0.0 && b.cycle_minutes.is_finite()) {
            errors.push(BalanceError::config("balancer.cycle_minutes", "must be > 0"));
        }

        let sol = &self.solar;
        if sol.sunrise_hour >= sol.sunset_hour {
            errors.push(BalanceError::config(
                "solar.sunrise_hour",
                "must be < solar.sunset_hour",
            ));
        }
        if sol.sunset_hour > 23 {
            errors.push(BalanceError::config("solar.sunset_hour", "must be <= 23"));
        }
        if !(sol.capacity_w >= 0.0 && sol.capacity_w.is_finite()) {
            errors.push(BalanceError::config("solar.capacity_w", "must be >= 0"));
        }

        let wind = &self.wind;
        if !wind.mean_w.is_finite() {
            errors.push(BalanceError::config("wind.mean_w", "must be finite"));
        }
        if !(wind.std_dev_w >= 0.0 && wind.std_dev_w.is_finite()) {
            errors.push(BalanceError::config("wind.std_dev_w", "must be >= 0"));
        }

        let bat = &self.battery;
        if !(bat.capacity_wh > 0.0 && bat.capacity_wh.is_finite()) {
            errors.push(BalanceError::config("battery.capacity_wh", "must be > 0"));
        }
        if !(0.0..=1.0).contains(&bat.initial_soc) {
            errors.push(BalanceError::config(
                "battery.initial_soc",
                "must be in [0.0, 1.0]",
            ));
        }
        if !(bat.eta_discharge > 0.0 && bat.eta_discharge <= 1.0) {
            errors.push(BalanceError::config(
                "battery.eta_discharge",
                "must be in (0.0, 1.0]",
            ));
        }

        if let Err(e) = self.demand().validate() {
            errors.push(BalanceError::config("demand", e.to_string()));
        }

        for kind in SourceKind::ALL {
            let count = self.sources.iter().filter(|s| s.kind == kind).count();
            if count != 1 {
                errors.push(BalanceError::config(
                    "sources",
                    format!("expected exactly one \"{kind}\" source, found {count}"),
                ));
            }
        }
        for source in self.energy_sources() {
            errors.extend(source.validate());
        }

        errors
    }
}
