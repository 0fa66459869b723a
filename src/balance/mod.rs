//! Allocation strategies and the balancer control loop.

pub mod allocation;
pub mod balancer;
/// Bounded history and windowed aggregates.
pub mod rolling_log;
pub mod strategies;
pub mod strategy;

pub use allocation::{Allocation, AllocationResult, EPSILON_W, StrategyMetrics};
pub use balancer::{Balancer, DashboardSnapshot, SharedBalancer, SnapshotStatus};
pub use rolling_log::{RollingLog, WindowSummary};
pub use strategies::{StrategyInputs, allocate, compare_strategies};
pub use strategy::Strategy;
