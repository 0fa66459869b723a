//! Bounded allocation history and windowed aggregates.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;

use crate::sources::SourceKind;

use super::allocation::AllocationResult;

/// Watts drawn per source class, summed over a window of allocations.
///
/// Computed post-hoc from stored results so the summary always agrees with
/// the history it describes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WindowSummary {
    /// Number of allocations in the window.
    pub allocations: usize,
    /// Total drawn from the grid (W).
    pub grid_w: f64,
    /// Total drawn from solar and wind (W).
    pub renewable_w: f64,
    /// Total drawn from the battery (W).
    pub battery_w: f64,
    /// Total unmet demand (W).
    pub deficit_w: f64,
    /// Allocations that ended with a deficit.
    pub deficit_count: usize,
}

impl WindowSummary {
    /// Aggregates the given results.
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a AllocationResult>) -> Self {
        let mut summary = Self::default();
        for r in results {
            summary.allocations += 1;
            summary.grid_w += r.allocated_w(SourceKind::Grid);
            summary.renewable_w += r.renewable_w();
            summary.battery_w += r.allocated_w(SourceKind::Battery);
            summary.deficit_w += r.deficit_w;
            if !r.is_fully_served() {
                summary.deficit_count += 1;
            }
        }
        summary
    }
}

impl fmt::Display for WindowSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "allocations={} | Grid: {:.0}W | Renewable: {:.0}W | Battery: {:.0}W | Deficit: {:.0}W ({} short)",
            self.allocations,
            self.grid_w,
            self.renewable_w,
            self.battery_w,
            self.deficit_w,
            self.deficit_count,
        )
    }
}

/// Count-bounded history of allocation results, oldest first.
#[derive(Debug, Clone)]
pub struct RollingLog {
    entries: VecDeque<AllocationResult>,
    capacity: usize,
}

impl RollingLog {
    /// Creates a log retaining at most `capacity` results (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a result, evicting the oldest once the log is full.
    pub fn push(&mut self, result: AllocationResult) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent result.
    pub fn latest(&self) -> Option<&AllocationResult> {
        self.entries.back()
    }

    /// All retained results, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &AllocationResult> {
        self.entries.iter()
    }

    /// The last `n` results (fewer if the log is shorter), oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &AllocationResult> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip)
    }

    /// Aggregates the last `n` results.
    pub fn summarize_recent(&self, n: usize) -> WindowSummary {
        WindowSummary::from_results(self.recent(n))
    }
}
