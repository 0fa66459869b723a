//! Registry of the energy sources a balancer can draw from.

use crate::error::{BalanceError, Result};

use super::types::{EnergySource, SourceKind};

/// Exactly one [`EnergySource`] per [`SourceKind`].
///
/// Owned by the balancer; strategies receive `&SourceRegistry` and never
/// mutate it.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRegistry {
    grid: EnergySource,
    solar: EnergySource,
    wind: EnergySource,
    battery: EnergySource,
}

impl SourceRegistry {
    /// Builds a registry from a list of sources.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if any source fails validation, a kind
    /// appears twice, or a kind is missing.
    pub fn new(sources: Vec<EnergySource>) -> Result<Self> {
        let mut grid = None;
        let mut solar = None;
        let mut wind = None;
        let mut battery = None;

        for source in sources {
            if let Some(err) = source.validate().into_iter().next() {
                return Err(err);
            }
            let slot = match source.kind {
                SourceKind::Grid => &mut grid,
                SourceKind::Solar => &mut solar,
                SourceKind::Wind => &mut wind,
                SourceKind::Battery => &mut battery,
            };
            let kind = source.kind;
            if slot.replace(source).is_some() {
                return Err(BalanceError::config(
                    "sources",
                    format!("source kind \"{kind}\" registered more than once"),
                ));
            }
        }

        let missing = |kind: SourceKind| {
            BalanceError::config("sources", format!("no \"{kind}\" source registered"))
        };
        Ok(Self {
            grid: grid.ok_or_else(|| missing(SourceKind::Grid))?,
            solar: solar.ok_or_else(|| missing(SourceKind::Solar))?,
            wind: wind.ok_or_else(|| missing(SourceKind::Wind))?,
            battery: battery.ok_or_else(|| missing(SourceKind::Battery))?,
        })
    }

    /// Returns the source of the given kind.
    pub fn get(&self, kind: SourceKind) -> &EnergySource {
        match kind {
            SourceKind::Grid => &self.grid,
            SourceKind::Solar => &self.solar,
            SourceKind::Wind => &self.wind,
            SourceKind::Battery => &self.battery,
        }
    }

    fn get_mut(&mut self, kind: SourceKind) -> &mut EnergySource {
        match kind {
            SourceKind::Grid => &mut self.grid,
            SourceKind::Solar => &mut self.solar,
            SourceKind::Wind => &mut self.wind,
            SourceKind::Battery => &mut self.battery,
        }
    }

    /// Power currently offerable by the given source (W).
    pub fn offerable_w(&self, kind: SourceKind) -> f64 {
        self.get(kind).offerable_w()
    }

    /// Sum of offerable power across all sources (W).
    pub fn total_offerable_w(&self) -> f64 {
        self.iter().map(EnergySource::offerable_w).sum()
    }

    /// Iterates sources in registry order (grid, solar, wind, battery).
    pub fn iter(&self) -> impl Iterator<Item = &EnergySource> {
        SourceKind::ALL.into_iter().map(|kind| self.get(kind))
    }

    /// Refreshes the live reading of one source.
    ///
    /// `available_w` is clamped to the source capacity. Returns the stored value.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error if `available_w` is negative or not finite.
    pub fn set_available(
        &mut self,
        kind: SourceKind,
        available_w: f64,
        is_available: bool,
    ) -> Result<f64> {
        if !available_w.is_finite() || available_w < 0.0 {
            return Err(BalanceError::Validation(format!(
                "{kind} power_available_w must be finite and >= 0, got {available_w}"
            )));
        }
        let source = self.get_mut(kind);
        source.power_available_w = available_w.min(source.power_capacity_w);
        source.is_available = is_available;
        Ok(source.power_available_w)
    }
}
