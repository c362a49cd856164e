//! Outcome tagging: replays each signal against the candles that follow it.
//!
//! Per signal the tagger walks candles strictly after the signal timestamp,
//! tracking adverse and favorable excursion in R units, and stops at the
//! first candle that touches the stop or the target:
//!
//! ```text
//! SCANNING ──stop hit (or stop+target in one candle)──► LOSS  (r = -1.0)
//!     │    ──target hit only─────────────────────────► WIN   (r = reward / risk)
//!     └────candles exhausted─────────────────────────► UNKNOWN
//! ```
//!
//! Signals are independent: the candle series is shared read-only and each
//! worker writes only its own outcome slot, so tagging runs as a rayon
//! parallel map whose indexed collect preserves input order.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::outcome::excursion;
use crate::domain::{Candle, CandleSeries, Direction, Outcome, OutcomeKind, Signal};

/// Resolution rule for a candle that touches both stop and target.
///
/// Only the stop-first rule exists: the candle is a loss. There is no
/// intrabar path information to justify any other choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreak {
    #[default]
    Loss,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TieBreakError {
    #[error("tie-break '{0}' is not supported (only 'loss' is implemented)")]
    Unsupported(String),
    #[error("unknown tie-break '{0}'")]
    Unknown(String),
}

impl FromStr for TieBreak {
    type Err = TieBreakError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "loss" | "sl" | "stop" => Ok(TieBreak::Loss),
            "win" | "tp" | "target" => Err(TieBreakError::Unsupported(s.to_string())),
            _ => Err(TieBreakError::Unknown(s.to_string())),
        }
    }
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TieBreak::Loss => f.write_str("loss"),
        }
    }
}

/// Replays signals against a shared candle series.
#[derive(Debug, Clone, Copy)]
pub struct OutcomeTagger<'a> {
    candles: &'a CandleSeries,
    tie_break: TieBreak,
}

impl<'a> OutcomeTagger<'a> {
    pub fn new(candles: &'a CandleSeries) -> Self {
        Self {
            candles,
            tie_break: TieBreak::default(),
        }
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Tag every signal. One outcome per signal, in input order.
    pub fn tag(&self, signals: &[Signal]) -> Vec<Outcome> {
        let outcomes: Vec<Outcome> = signals.par_iter().map(|s| self.tag_signal(s)).collect();
        debug!(
            signals = signals.len(),
            candles = self.candles.len(),
            tie_break = %self.tie_break(),
            "tagged signals"
        );
        outcomes
    }

    /// Tag a single signal. Never fails: an unresolved scan is `Unknown`.
    pub fn tag_signal(&self, signal: &Signal) -> Outcome {
        if !signal.has_valid_risk() {
            warn!(
                signal_id = %signal.signal_id,
                entry = signal.entry,
                sl = signal.sl,
                "stop on wrong side of entry, using unit risk"
            );
        }
        let risk = signal.risk();
        let mut scan = Excursion::default();

        for candle in self.candles.after(signal.timestamp) {
            scan.update(signal, candle, risk);

            let (stop_hit, target_hit) = hits(signal, candle);
            match (stop_hit, target_hit, self.tie_break) {
                (true, _, TieBreak::Loss) => return loss(signal, candle, &scan),
                (false, true, _) => return win(signal, candle, risk, &scan),
                (false, false, _) => {}
            }
        }

        Outcome::unknown(signal.signal_id.clone(), scan.mae, scan.mfe)
    }
}

/// Tag `signals` against `candles` with the given tie-break rule.
pub fn tag_outcomes(signals: &[Signal], candles: &CandleSeries, tie_break: TieBreak) -> Vec<Outcome> {
    OutcomeTagger::new(candles)
        .with_tie_break(tie_break)
        .tag(signals)
}

/// Running excursion maxima in R units. Both start at zero and only grow.
#[derive(Debug, Default, Clone, Copy)]
struct Excursion {
    mae: f64,
    mfe: f64,
}

impl Excursion {
    fn update(&mut self, signal: &Signal, candle: &Candle, risk: f64) {
        let entry = signal.entry;
        match signal.direction {
            Direction::Long => {
                if candle.low < entry {
                    self.mae = self.mae.max((entry - candle.low) / risk);
                }
                if candle.high > entry {
                    self.mfe = self.mfe.max((candle.high - entry) / risk);
                }
            }
            Direction::Short => {
                if candle.high > entry {
                    self.mae = self.mae.max((candle.high - entry) / risk);
                }
                if candle.low < entry {
                    self.mfe = self.mfe.max((entry - candle.low) / risk);
                }
            }
        }
    }
}

/// `(stop_hit, target_hit)` for one candle.
fn hits(signal: &Signal, candle: &Candle) -> (bool, bool) {
    match signal.direction {
        Direction::Long => (candle.low <= signal.sl, candle.high >= signal.tp),
        Direction::Short => (candle.high >= signal.sl, candle.low <= signal.tp),
    }
}

/// Losses exit exactly at the stop, so the R-multiple is exactly -1.
fn loss(signal: &Signal, candle: &Candle, scan: &Excursion) -> Outcome {
    Outcome {
        signal_id: signal.signal_id.clone(),
        outcome: OutcomeKind::Loss,
        r_multiple: Some(-1.0),
        mae: excursion(scan.mae),
        mfe: excursion(scan.mfe),
        exit_price: Some(signal.sl),
        exit_time: Some(candle.timestamp),
    }
}

fn win(signal: &Signal, candle: &Candle, risk: f64, scan: &Excursion) -> Outcome {
    let reward = match signal.direction {
        Direction::Long => signal.tp - signal.entry,
        Direction::Short => signal.entry - signal.tp,
    };
    Outcome {
        signal_id: signal.signal_id.clone(),
        outcome: OutcomeKind::Win,
        r_multiple: Some(reward / risk),
        mae: excursion(scan.mae),
        mfe: excursion(scan.mfe),
        exit_price: Some(signal.tp),
        exit_time: Some(candle.timestamp),
    }
}
