//! Replay runner: wires loaders, tagger, and aggregation together.
//!
//! Two entry points:
//! - `run_replay()`: loads candles and signals from the configured paths. Used by CLI.
//! - `run_replay_from_data()`: takes pre-loaded data, no I/O.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use replaylab_core::data::{load_candles, load_signals, LoadError};
use replaylab_core::domain::{CandleSeries, Outcome, Signal};
use replaylab_core::engine::{OutcomeTagger, TieBreak};

use crate::batch::{pair_outcomes, BatchReport, GroupRow};
use crate::config::{ConfigError, ReplayConfig};
use crate::metrics::CorpusMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("failed to build tagging thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of one replay.
///
/// Outcomes are not part of the JSON document; they are persisted
/// separately as JSONL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub dataset_hash: String,
    pub tie_break: TieBreak,
    pub candle_count: usize,
    pub signal_count: usize,
    pub overall: CorpusMetrics,
    pub groups: Vec<GroupRow>,
    #[serde(skip)]
    pub outcomes: Vec<Outcome>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl ReplayResult {
    /// Copy with every metric float rounded to `decimals` places. Outcomes
    /// are carried over untouched.
    pub fn rounded(&self, decimals: u32) -> Self {
        let report = BatchReport {
            overall: self.overall.clone(),
            groups: self.groups.clone(),
        }
        .rounded(decimals);
        Self {
            overall: report.overall,
            groups: report.groups,
            ..self.clone()
        }
    }
}

/// Run a replay from a config, loading both inputs from disk.
pub fn run_replay(config: &ReplayConfig) -> Result<ReplayResult, RunError> {
    config.validate()?;
    let (candles_path, signals_path) = config.input_paths()?;
    let opts = config.load_options();

    let candles = load_candles(candles_path, &opts)?;
    let signals = load_signals(signals_path, &opts)?;
    info!(
        candles = candles.len(),
        signals = signals.len(),
        "loaded replay inputs"
    );

    run_replay_from_data(&signals, &candles, config)
}

/// Run a replay with pre-loaded data: no I/O.
pub fn run_replay_from_data(
    signals: &[Signal],
    candles: &CandleSeries,
    config: &ReplayConfig,
) -> Result<ReplayResult, RunError> {
    let tie_break = config.tie_break()?;
    let edges = config.histogram_edges()?;

    let outcomes = tag_in_pool(signals, candles, tie_break, config.tagging.threads)?;
    let pairs = pair_outcomes(signals, &outcomes);
    let report = BatchReport::build(&pairs, &edges);

    info!(
        outcomes = outcomes.len(),
        unknown = report.overall.unknown,
        groups = report.groups.len(),
        "replay complete"
    );

    Ok(ReplayResult {
        schema_version: SCHEMA_VERSION,
        dataset_hash: compute_dataset_hash(candles, signals),
        tie_break,
        candle_count: candles.len(),
        signal_count: signals.len(),
        overall: report.overall,
        groups: report.groups,
        outcomes,
    })
}

/// Tag on a private pool when `threads > 0`, else on rayon's global pool.
fn tag_in_pool(
    signals: &[Signal],
    candles: &CandleSeries,
    tie_break: TieBreak,
    threads: usize,
) -> Result<Vec<Outcome>, RunError> {
    let tagger = OutcomeTagger::new(candles).with_tie_break(tie_break);
    if threads == 0 {
        return Ok(tagger.tag(signals));
    }
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
    Ok(pool.install(|| tagger.tag(signals)))
}

/// Compute a deterministic BLAKE3 hash over candles and signals in loaded
/// order.
///
/// Covers every field the tagger reads, so equal hashes mean equal outcomes
/// for the same tie-break.
pub fn compute_dataset_hash(candles: &CandleSeries, signals: &[Signal]) -> String {
    let mut hasher = blake3::Hasher::new();

    for c in candles {
        hasher.update(&c.timestamp.timestamp_micros().to_le_bytes());
        hasher.update(&c.open.to_le_bytes());
        hasher.update(&c.high.to_le_bytes());
        hasher.update(&c.low.to_le_bytes());
        hasher.update(&c.close.to_le_bytes());
        hasher.update(&c.volume.unwrap_or(f64::NAN).to_le_bytes());
    }

    for s in signals {
        hash_str(&mut hasher, &s.signal_id);
        hasher.update(&s.timestamp.timestamp_micros().to_le_bytes());
        hash_str(&mut hasher, &s.symbol);
        hash_str(&mut hasher, &s.timeframe);
        hash_str(&mut hasher, s.direction.as_str());
        hash_opt_str(&mut hasher, s.signal_type.as_deref());
        hash_opt_str(&mut hasher, s.session.as_deref());
        hasher.update(&s.entry.to_le_bytes());
        hasher.update(&s.sl.to_le_bytes());
        hasher.update(&s.tp.to_le_bytes());
    }

    hasher.finalize().to_hex().to_string()
}

/// Length-prefixed so adjacent fields cannot run into each other.
fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn hash_opt_str(hasher: &mut blake3::Hasher, s: Option<&str>) {
    match s {
        Some(s) => {
            hasher.update(&[1]);
            hash_str(hasher, s);
        }
        None => {
            hasher.update(&[0]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use replaylab_core::domain::{Candle, Direction, OutcomeKind};

    fn t(minute: i64) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn candles() -> CandleSeries {
        CandleSeries::new(vec![
            Candle {
                timestamp: t(1),
                open: 100.0,
                high: 100.5,
                low: 99.6,
                close: 100.2,
                volume: Some(10.0),
            },
            Candle {
                timestamp: t(2),
                open: 100.2,
                high: 102.2,
                low: 100.1,
                close: 102.0,
                volume: None,
            },
        ])
    }

    fn signal(id: &str, direction: Direction, entry: f64, sl: f64, tp: f64) -> Signal {
        Signal {
            signal_id: id.into(),
            timestamp: t(0),
            symbol: "XAUUSD".into(),
            timeframe: "M1".into(),
            direction,
            signal_type: Some("sweep".into()),
            entry,
            sl,
            tp,
            session: Some("asia".into()),
            meta: serde_json::Map::new(),
        }
    }

    #[test]
    fn from_data_tags_and_aggregates() {
        let signals = vec![
            signal("w", Direction::Long, 100.0, 99.0, 102.0),
            signal("l", Direction::Short, 100.0, 101.0, 95.0),
        ];
        let result = run_replay_from_data(&signals, &candles(), &ReplayConfig::default()).unwrap();

        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert_eq!(result.candle_count, 2);
        assert_eq!(result.signal_count, 2);
        assert_eq!(result.outcomes[0].outcome, OutcomeKind::Win);
        assert_eq!(result.outcomes[1].outcome, OutcomeKind::Loss);
        assert_eq!(result.overall.sample_size, 2);
        assert_eq!(result.groups.len(), 2);
        // Long win (exp 2.0) ranks above short loss (exp -1.0).
        assert_eq!(result.groups[0].key.direction, Direction::Long);
    }

    #[test]
    fn private_pool_matches_global_pool() {
        let signals: Vec<Signal> = (0..32)
            .map(|i| signal(&format!("s{i}"), Direction::Long, 100.0, 99.0, 100.0 + i as f64 * 0.1))
            .collect();
        let mut config = ReplayConfig::default();
        let global = run_replay_from_data(&signals, &candles(), &config).unwrap();
        config.tagging.threads = 3;
        let pooled = run_replay_from_data(&signals, &candles(), &config).unwrap();
        assert_eq!(global.outcomes, pooled.outcomes);
        assert_eq!(global, pooled);
    }

    #[test]
    fn unsupported_tie_break_fails_before_tagging() {
        let mut config = ReplayConfig::default();
        config.tagging.tie_break = "win".into();
        let err = run_replay_from_data(&[], &candles(), &config).unwrap_err();
        assert!(matches!(err, RunError::Config(ConfigError::TieBreak(_))));
    }

    #[test]
    fn missing_paths_is_config_error() {
        let err = run_replay(&ReplayConfig::default()).unwrap_err();
        assert!(matches!(err, RunError::Config(ConfigError::MissingPath(_))));
    }

    #[test]
    fn dataset_hash_is_stable_and_sensitive() {
        let signals = vec![signal("a", Direction::Long, 100.0, 99.0, 102.0)];
        let h1 = compute_dataset_hash(&candles(), &signals);
        let h2 = compute_dataset_hash(&candles(), &signals);
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);

        let moved = vec![signal("a", Direction::Long, 100.0, 99.0, 102.5)];
        assert_ne!(h1, compute_dataset_hash(&candles(), &moved));
    }

    #[test]
    fn dataset_hash_separates_adjacent_text_fields() {
        let mut a = signal("a", Direction::Long, 100.0, 99.0, 102.0);
        a.symbol = "EURUSD".into();
        a.timeframe = "M5".into();
        a.signal_type = Some("x".into());
        a.session = None;

        let mut b = a.clone();
        b.symbol = "EURUSDM".into();
        b.timeframe = "5".into();
        b.signal_type = None;
        b.session = Some("x".into());

        assert_ne!(
            compute_dataset_hash(&candles(), &[a.clone()]),
            compute_dataset_hash(&candles(), &[b])
        );

        let mut empty = a.clone();
        empty.signal_type = Some(String::new());
        let mut absent = a;
        absent.signal_type = None;
        assert_ne!(
            compute_dataset_hash(&candles(), &[empty]),
            compute_dataset_hash(&candles(), &[absent])
        );
    }

    #[test]
    fn rounded_keeps_outcomes() {
        let signals = vec![signal("w", Direction::Long, 100.0, 99.4, 102.0)];
        let result = run_replay_from_data(&signals, &candles(), &ReplayConfig::default()).unwrap();
        let rounded = result.rounded(4);
        assert_eq!(rounded.outcomes, result.outcomes);
        assert_eq!(rounded.overall.expectancy, 3.3333);
    }
}
