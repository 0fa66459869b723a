//! Source Registry: static and live attributes of each energy source.

/// Battery state-of-charge tracking.
pub mod battery;
pub mod registry;
pub mod types;

pub use battery::BatteryState;
pub use registry::SourceRegistry;
pub use types::{EnergySource, SourceKind};
