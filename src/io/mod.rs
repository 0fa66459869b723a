//! File outputs: CSV history export and dashboard snapshots.

pub mod export;
pub mod snapshot;
