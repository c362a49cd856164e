//! Signal: a historical trade idea with entry, stop and target.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    /// Case-insensitive: `"LONG"`, `"Long"` and `"long"` all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "long" => Ok(Direction::Long),
            "short" => Ok(Direction::Short),
            other => Err(format!("unknown direction '{other}' (expected long or short)")),
        }
    }
}

/// A trade signal replayed against candle history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub signal_id: String,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub timeframe: String,
    pub direction: Direction,
    pub signal_type: Option<String>,
    pub entry: f64,
    pub sl: f64,
    pub tp: f64,
    pub session: Option<String>,
    #[serde(default)]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl Signal {
    /// Distance from entry to stop in the direction of the trade.
    ///
    /// Non-positive distances (stop on the wrong side, or at entry) fall back
    /// to `1.0` so R-multiples never divide by zero or flip sign.
    pub fn risk(&self) -> f64 {
        let raw = match self.direction {
            Direction::Long => self.entry - self.sl,
            Direction::Short => self.sl - self.entry,
        };
        if raw <= 0.0 {
            1.0
        } else {
            raw
        }
    }

    /// True when the stop sits on the correct side of entry.
    pub fn has_valid_risk(&self) -> bool {
        match self.direction {
            Direction::Long => self.entry - self.sl > 0.0,
            Direction::Short => self.sl - self.entry > 0.0,
        }
    }
}
