//! Outcome: the tagged result of replaying one signal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolution label for a replayed signal.
///
/// `BreakEven` is part of the vocabulary (outcome files from other sources
/// may carry it) but the tagger only ever produces `Win`, `Loss` or `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeKind {
    #[serde(rename = "WIN")]
    Win,
    #[serde(rename = "LOSS")]
    Loss,
    #[serde(rename = "BE")]
    BreakEven,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Win => "WIN",
            OutcomeKind::Loss => "LOSS",
            OutcomeKind::BreakEven => "BE",
            OutcomeKind::Unknown => "UNKNOWN",
        }
    }

    /// Win, loss or break-even: a label that can carry an R-multiple.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, OutcomeKind::Unknown)
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of replaying a single signal.
///
/// `None` in any numeric field means "not computed". For `mae`/`mfe` an
/// excursion that never left zero is reported as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub signal_id: String,
    pub outcome: OutcomeKind,
    pub r_multiple: Option<f64>,
    pub mae: Option<f64>,
    pub mfe: Option<f64>,
    pub exit_price: Option<f64>,
    pub exit_time: Option<DateTime<Utc>>,
}

impl Outcome {
    /// Unresolved outcome: candles ran out before stop or target.
    pub fn unknown(signal_id: impl Into<String>, mae: f64, mfe: f64) -> Self {
        Self {
            signal_id: signal_id.into(),
            outcome: OutcomeKind::Unknown,
            r_multiple: None,
            mae: excursion(mae),
            mfe: excursion(mfe),
            exit_price: None,
            exit_time: None,
        }
    }

    /// An outcome whose label is resolved and whose R-multiple is known.
    pub fn is_evaluable(&self) -> bool {
        self.outcome.is_resolved() && self.r_multiple.is_some()
    }
}

/// Map an accumulated excursion to its reported form: exactly zero is `None`.
pub(crate) fn excursion(value: f64) -> Option<f64> {
    if value == 0.0 {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_has_no_r_or_exit() {
        let o = Outcome::unknown("s1", 0.0, 0.4);
        assert_eq!(o.outcome, OutcomeKind::Unknown);
        assert!(o.r_multiple.is_none());
        assert!(o.exit_price.is_none());
        assert!(o.exit_time.is_none());
        assert!(o.mae.is_none());
        assert_eq!(o.mfe, Some(0.4));
        assert!(!o.is_evaluable());
    }

    #[test]
    fn kind_serializes_as_upper_label() {
        assert_eq!(serde_json::to_string(&OutcomeKind::Win).unwrap(), "\"WIN\"");
        assert_eq!(
            serde_json::to_string(&OutcomeKind::BreakEven).unwrap(),
            "\"BE\""
        );
        let back: OutcomeKind = serde_json::from_str("\"UNKNOWN\"").unwrap();
        assert_eq!(back, OutcomeKind::Unknown);
    }

    #[test]
    fn outcome_json_uses_null_for_missing_fields() {
        let o = Outcome::unknown("s9", 0.0, 0.0);
        let json = serde_json::to_value(&o).unwrap();
        assert!(json["r_multiple"].is_null());
        assert!(json["exit_time"].is_null());
        assert_eq!(json["outcome"], "UNKNOWN");
    }
}
