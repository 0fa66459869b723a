use crate::error::{BalanceError, Result};

/// State-of-charge bookkeeping for the battery source.
///
/// The battery entry in the registry only says how much power the battery may
/// deliver right now; `BatteryState` tracks how much energy is left behind that
/// figure so that repeated allocations drain it.
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryState {
    /// Usable energy capacity in watt-hours.
    pub capacity_wh: f64,

    /// State of charge as a fraction (0.0 to 1.0).
    soc: f64,

    /// Maximum discharge power in watts.
    pub max_discharge_w: f64,

    /// Discharging efficiency (0..1.0).
    pub eta_discharge: f64,
}

impl BatteryState {
    /// Creates a new battery state.
    ///
    /// # Arguments
    ///
    /// * `capacity_wh` - Usable capacity in Wh (must be > 0)
    /// * `soc` - Initial state of charge (0.0 to 1.0)
    /// * `max_discharge_w` - Maximum discharge power in W
    /// * `eta_discharge` - Discharging efficiency (0..1.0)
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error when any argument is out of range.
    pub fn new(capacity_wh: f64, soc: f64, max_discharge_w: f64, eta_discharge: f64) -> Result<Self> {
        if !(capacity_wh > 0.0 && capacity_wh.is_finite()) {
            return Err(BalanceError::config("battery.capacity_wh", "must be > 0"));
        }
        if !(0.0..=1.0).contains(&soc) {
            return Err(BalanceError::config("battery.initial_soc", "must be in [0.0, 1.0]"));
        }
        if !(max_discharge_w >= 0.0 && max_discharge_w.is_finite()) {
            return Err(BalanceError::config("battery.max_discharge_w", "must be >= 0"));
        }
        if !(eta_discharge > 0.0 && eta_discharge <= 1.0) {
            return Err(BalanceError::config(
                "battery.eta_discharge",
                "must be in (0.0, 1.0]",
            ));
        }
        Ok(Self {
            capacity_wh,
            soc,
            max_discharge_w,
            eta_discharge,
        })
    }

    /// Current state of charge (0.0 to 1.0).
    pub fn soc(&self) -> f64 {
        self.soc
    }

    /// Stored energy in Wh.
    pub fn remaining_wh(&self) -> f64 {
        self.soc * self.capacity_wh
    }

    /// Power the battery can sustain for a whole cycle of `cycle_hours` (W).
    pub fn deliverable_w(&self, cycle_hours: f64) -> f64 {
        if cycle_hours <= 0.0 {
            return self.max_discharge_w;
        }
        let energy_limited = self.remaining_wh() * self.eta_discharge / cycle_hours;
        self.max_discharge_w.min(energy_limited.max(0.0))
    }

    /// Energy left after delivering `draw_w` for `cycle_hours`, without mutating.
    pub fn remaining_after(&self, draw_w: f64, cycle_hours: f64) -> f64 {
        let drained = draw_w.max(0.0) * cycle_hours.max(0.0) / self.eta_discharge;
        (self.remaining_wh() - drained).max(0.0)
    }

    /// Delivers `draw_w` for `cycle_hours` and updates the state of charge.
    ///
    /// Returns the energy actually taken out of storage (Wh).
    pub fn discharge(&mut self, draw_w: f64, cycle_hours: f64) -> f64 {
        let before = self.remaining_wh();
        let after = self.remaining_after(draw_w, cycle_hours);
        self.soc = (after / self.capacity_wh).clamp(0.0, 1.0);
        before - after
    }

    /// Adds `energy_wh` to storage (e.g. from an external charger feed).
    ///
    /// Returns the energy actually stored once full capacity is reached.
    pub fn recharge(&mut self, energy_wh: f64) -> f64 {
        let before = self.remaining_wh();
        let after = (before + energy_wh.max(0.0)).min(self.capacity_wh);
        self.soc = (after / self.capacity_wh).clamp(0.0, 1.0);
        after - before
    }
}
