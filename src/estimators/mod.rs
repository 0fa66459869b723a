//! Generation estimators for weather-dependent sources.

/// Constant or externally fed reading.
pub mod fixed;
/// Time-of-day solar curve.
pub mod solar;
pub mod types;
/// Normally distributed wind output.
pub mod wind;

pub use fixed::FixedEstimator;
pub use solar::SolarEstimator;
pub use types::{EstimateContext, Generation, GenerationEstimator};
pub use wind::WindEstimator;
