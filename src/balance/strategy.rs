use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BalanceError;

/// Prioritisation policy used to distribute demand across sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    /// Mains first, battery as buffer, renewables as last resort.
    GridPriority,
    /// Solar and wind first, battery for peaks, mains as fallback.
    RenewableFirst,
    /// Battery first, renewables second, mains for emergencies only.
    OffGrid,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Self::GridPriority, Self::RenewableFirst, Self::OffGrid];

    /// Identifier used in configuration and results.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GridPriority => "GRID_PRIORITY",
            Self::RenewableFirst => "RENEWABLE_FIRST",
            Self::OffGrid => "OFF_GRID",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = BalanceError;

    /// Parses an identifier. Unknown identifiers never fall back to a default.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(Strategy::as_str).collect();
                BalanceError::config(
                    "balancer.strategy",
                    format!("unknown strategy \"{s}\", available: {}", known.join(", ")),
                )
            })
    }
}
