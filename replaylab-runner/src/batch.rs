//! Batch aggregation: join outcomes back to their signals and report per
//! (symbol, timeframe, session, signal type, direction) group.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use replaylab_core::domain::{Direction, Outcome, Signal};

use crate::metrics::{CorpusMetrics, HistogramEdges};

/// Partition key for grouped reporting. Ordering is field-wise, `None`
/// before `Some`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub symbol: String,
    pub timeframe: String,
    pub session: Option<String>,
    pub signal_type: Option<String>,
    pub direction: Direction,
}

impl GroupKey {
    pub fn of(signal: &Signal) -> Self {
        Self {
            symbol: signal.symbol.clone(),
            timeframe: signal.timeframe.clone(),
            session: signal.session.clone(),
            signal_type: signal.signal_type.clone(),
            direction: signal.direction,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.symbol,
            self.timeframe,
            self.session.as_deref().unwrap_or("-"),
            self.signal_type.as_deref().unwrap_or("-"),
            self.direction
        )
    }
}

/// Join outcomes to signals by `signal_id`.
///
/// When several signals share an id the first one in `signals` wins.
/// Outcomes whose id matches no signal are dropped with a warning. Output
/// follows the order of `outcomes`.
pub fn pair_outcomes<'a>(
    signals: &'a [Signal],
    outcomes: &'a [Outcome],
) -> Vec<(&'a Signal, &'a Outcome)> {
    let mut by_id: HashMap<&str, &Signal> = HashMap::with_capacity(signals.len());
    for s in signals {
        by_id.entry(s.signal_id.as_str()).or_insert(s);
    }

    let mut orphans = 0usize;
    let pairs: Vec<_> = outcomes
        .iter()
        .filter_map(|o| match by_id.get(o.signal_id.as_str()) {
            Some(s) => Some((*s, o)),
            None => {
                orphans += 1;
                None
            }
        })
        .collect();

    if orphans > 0 {
        warn!(orphans, "dropped outcomes with no matching signal");
    }
    pairs
}

/// One row of the grouped report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRow {
    pub key: GroupKey,
    pub metrics: CorpusMetrics,
}

/// Overall metrics plus one row per group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub overall: CorpusMetrics,
    /// Sorted by expectancy desc, then sample size desc, then key asc.
    pub groups: Vec<GroupRow>,
}

impl BatchReport {
    /// Aggregate paired outcomes.
    ///
    /// Pairs are stable-sorted by signal timestamp first, so drawdown and
    /// streaks see each group in chronological order regardless of input
    /// order.
    pub fn build(pairs: &[(&Signal, &Outcome)], edges: &HistogramEdges) -> Self {
        let mut ordered: Vec<(&Signal, &Outcome)> = pairs.to_vec();
        ordered.sort_by_key(|(s, _)| s.timestamp);

        let mut partitions: BTreeMap<GroupKey, Vec<Outcome>> = BTreeMap::new();
        let mut all = Vec::with_capacity(ordered.len());
        for (signal, outcome) in &ordered {
            partitions
                .entry(GroupKey::of(signal))
                .or_default()
                .push((*outcome).clone());
            all.push((*outcome).clone());
        }

        let mut groups: Vec<GroupRow> = partitions
            .into_iter()
            .map(|(key, outcomes)| GroupRow {
                key,
                metrics: CorpusMetrics::compute(&outcomes, edges),
            })
            .collect();
        groups.sort_by(compare_rows);

        debug!(pairs = ordered.len(), groups = groups.len(), "built batch report");

        Self {
            overall: CorpusMetrics::compute(&all, edges),
            groups,
        }
    }

    /// Copy with every metric float rounded to `decimals` places.
    pub fn rounded(&self, decimals: u32) -> Self {
        Self {
            overall: self.overall.rounded(decimals),
            groups: self
                .groups
                .iter()
                .map(|row| GroupRow {
                    key: row.key.clone(),
                    metrics: row.metrics.rounded(decimals),
                })
                .collect(),
        }
    }
}

/// Ranks on full-precision expectancy, before any report rounding. Rows that
/// print the same 4-decimal expectancy keep their unrounded order.
fn compare_rows(a: &GroupRow, b: &GroupRow) -> Ordering {
    b.metrics
        .expectancy
        .total_cmp(&a.metrics.expectancy)
        .then_with(|| b.metrics.sample_size.cmp(&a.metrics.sample_size))
        .then_with(|| a.key.cmp(&b.key))
}
