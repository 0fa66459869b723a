//! Hybrid energy balancer: distributes a site's power demand across grid,
//! solar, wind, and battery sources under a selectable priority policy.

/// Strategies, allocation results, and the balancer control loop.
pub mod balance;
pub mod config;
pub mod demand;
pub mod error;
pub mod estimators;
pub mod io;
pub mod sources;

pub use balance::{AllocationResult, Balancer, SharedBalancer, Strategy};
pub use error::{BalanceError, Result};
