//! R-multiple metrics: pure functions over tagged outcomes.
//!
//! Every metric is a pure function: outcome slice in, scalar or aggregate
//! out. Nothing here sorts its input; drawdown and streaks are computed in
//! the order given, so callers pre-sort chronologically.
//!
//! Two break-even notions coexist and are kept apart:
//! - label-based: `win_rate` / `break_even_rate` count `WIN` / `BE` labels
//! - sign-based: `CorpusMetrics` classifies by the sign of `r_multiple`
//!
//! On tagger output the two agree (the tagger never emits `BE`, and every
//! resolved outcome carries an R-multiple), but outcome files from other
//! sources may disagree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use replaylab_core::domain::{Outcome, OutcomeKind};

// ─── Scalar metrics ─────────────────────────────────────────────────

/// R-multiples of evaluable outcomes (resolved label and R present), in
/// input order.
pub fn distribution(outcomes: &[Outcome]) -> Vec<f64> {
    outcomes
        .iter()
        .filter(|o| o.is_evaluable())
        .filter_map(|o| o.r_multiple)
        .collect()
}

/// Mean R-multiple over evaluable outcomes. 0.0 if none are evaluable.
pub fn expectancy(outcomes: &[Outcome]) -> f64 {
    mean_f64(&distribution(outcomes))
}

/// Fraction of `WIN` labels among outcomes labelled WIN/LOSS/BE with an
/// R-multiple present.
pub fn win_rate(outcomes: &[Outcome]) -> f64 {
    label_rate(outcomes, OutcomeKind::Win)
}

/// Fraction of `BE` labels, same denominator as [`win_rate`].
pub fn break_even_rate(outcomes: &[Outcome]) -> f64 {
    label_rate(outcomes, OutcomeKind::BreakEven)
}

fn label_rate(outcomes: &[Outcome], kind: OutcomeKind) -> f64 {
    let decided: Vec<&Outcome> = outcomes.iter().filter(|o| o.is_evaluable()).collect();
    if decided.is_empty() {
        return 0.0;
    }
    let hits = decided.iter().filter(|o| o.outcome == kind).count();
    hits as f64 / decided.len() as f64
}

/// Gross winning R over gross losing R (by sign). 0.0 when there are no
/// losses.
pub fn profit_factor(outcomes: &[Outcome]) -> f64 {
    let rs = r_values(outcomes);
    let gross_win: f64 = rs.iter().filter(|&&r| r > 0.0).sum();
    let gross_loss: f64 = rs.iter().filter(|&&r| r < 0.0).map(|r| r.abs()).sum();
    if gross_loss == 0.0 {
        return 0.0;
    }
    gross_win / gross_loss
}

/// Maximum peak-to-trough decline of the cumulative R curve.
///
/// The curve starts at 0 and the running peak starts there too, so a
/// leading loss counts as drawdown. Never negative.
pub fn max_drawdown_r(outcomes: &[Outcome]) -> f64 {
    let mut cumulative = 0.0_f64;
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;

    for r in r_values(outcomes) {
        cumulative += r;
        if cumulative > peak {
            peak = cumulative;
        }
        let dd = peak - cumulative;
        if dd > max_dd {
            max_dd = dd;
        }
    }
    max_dd
}

/// Longest run of strictly positive R-multiples.
pub fn max_win_streak(outcomes: &[Outcome]) -> usize {
    streaks(outcomes).0
}

/// Longest run of strictly negative R-multiples.
pub fn max_loss_streak(outcomes: &[Outcome]) -> usize {
    streaks(outcomes).1
}

/// `(max_win_streak, max_loss_streak)`.
///
/// A zero R-multiple resets both counters. Outcomes without an R-multiple
/// are skipped: they neither extend nor break a run.
fn streaks(outcomes: &[Outcome]) -> (usize, usize) {
    let (mut win, mut loss) = (0usize, 0usize);
    let (mut max_win, mut max_loss) = (0usize, 0usize);

    for r in r_values(outcomes) {
        if r > 0.0 {
            win += 1;
            loss = 0;
        } else if r < 0.0 {
            loss += 1;
            win = 0;
        } else {
            win = 0;
            loss = 0;
        }
        max_win = max_win.max(win);
        max_loss = max_loss.max(loss);
    }
    (max_win, max_loss)
}

/// Mean MAE over outcomes that carry one.
pub fn average_mae(outcomes: &[Outcome]) -> Option<f64> {
    mean_present(outcomes.iter().filter_map(|o| o.mae))
}

/// Mean MFE over outcomes that carry one.
pub fn average_mfe(outcomes: &[Outcome]) -> Option<f64> {
    mean_present(outcomes.iter().filter_map(|o| o.mfe))
}

// ─── Per-key grouping ───────────────────────────────────────────────

/// Label-based summary for one partition of outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Evaluable outcomes in the group.
    pub count: usize,
    pub expectancy: f64,
    pub win_rate: f64,
    pub be_rate: f64,
}

impl GroupSummary {
    pub fn compute(outcomes: &[Outcome]) -> Self {
        Self {
            count: outcomes.iter().filter(|o| o.is_evaluable()).count(),
            expectancy: expectancy(outcomes),
            win_rate: win_rate(outcomes),
            be_rate: break_even_rate(outcomes),
        }
    }
}

/// Partition outcomes by `key_fn` and summarise each partition.
///
/// The result is ordered by key; each group sees its outcomes in input
/// order.
pub fn group_metrics<K, F>(outcomes: &[Outcome], key_fn: F) -> BTreeMap<K, GroupSummary>
where
    K: Ord,
    F: Fn(&Outcome) -> K,
{
    let mut groups: BTreeMap<K, Vec<Outcome>> = BTreeMap::new();
    for o in outcomes {
        groups.entry(key_fn(o)).or_default().push(o.clone());
    }
    groups
        .into_iter()
        .map(|(k, items)| (k, GroupSummary::compute(&items)))
        .collect()
}

// ─── Histogram ──────────────────────────────────────────────────────

/// Bucket edges for the R-multiple histogram.
///
/// Negative buckets are closed on the left (`[a,b)`), positive buckets on
/// the right (`(a,b]`), and exact zero has its own bucket. The defaults give
/// `< -2`, `[-2,-1)`, `[-1,0)`, `0`, `(0,1]`, `(1,2]`, `> 2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramEdges {
    /// Strictly increasing, all `< 0`.
    pub negative: Vec<f64>,
    /// Strictly increasing, all `> 0`.
    pub positive: Vec<f64>,
}

impl Default for HistogramEdges {
    fn default() -> Self {
        Self {
            negative: vec![-2.0, -1.0],
            positive: vec![1.0, 2.0],
        }
    }
}

impl HistogramEdges {
    pub fn new(negative: Vec<f64>, positive: Vec<f64>) -> Result<Self, String> {
        let edges = Self { negative, positive };
        edges.validate()?;
        Ok(edges)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.negative.iter().any(|e| !e.is_finite() || *e >= 0.0) {
            return Err(format!("negative edges must be finite and < 0: {:?}", self.negative));
        }
        if self.positive.iter().any(|e| !e.is_finite() || *e <= 0.0) {
            return Err(format!("positive edges must be finite and > 0: {:?}", self.positive));
        }
        let increasing = |v: &[f64]| v.windows(2).all(|w| w[0] < w[1]);
        if !increasing(&self.negative) || !increasing(&self.positive) {
            return Err("histogram edges must be strictly increasing".into());
        }
        Ok(())
    }

    /// Bucket labels in display order.
    pub fn labels(&self) -> Vec<String> {
        let neg = &self.negative;
        let pos = &self.positive;
        let mut labels = Vec::with_capacity(neg.len() + pos.len() + 3);

        labels.push(match neg.first() {
            Some(first) => format!("< {first}"),
            None => "< 0".to_string(),
        });
        for (i, lower) in neg.iter().enumerate() {
            let upper = neg.get(i + 1).copied().unwrap_or(0.0);
            labels.push(format!("[{lower},{upper})"));
        }

        labels.push("0".to_string());

        for (i, upper) in pos.iter().enumerate() {
            let lower = if i == 0 { 0.0 } else { pos[i - 1] };
            labels.push(format!("({lower},{upper}]"));
        }
        labels.push(match pos.last() {
            Some(last) => format!("> {last}"),
            None => "> 0".to_string(),
        });

        labels
    }

    /// Bucket index for `r`, or `None` for NaN.
    pub fn bucket_of(&self, r: f64) -> Option<usize> {
        let zero = self.negative.len() + 1;
        if r.is_nan() {
            None
        } else if r < 0.0 {
            Some(self.negative.iter().filter(|&&e| e <= r).count())
        } else if r == 0.0 {
            Some(zero)
        } else {
            Some(zero + 1 + self.positive.iter().filter(|&&e| e < r).count())
        }
    }
}

/// One histogram bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub label: String,
    pub count: usize,
}

/// Count R-multiples (every outcome that carries one) into fixed buckets.
pub fn r_histogram(outcomes: &[Outcome], edges: &HistogramEdges) -> Vec<HistogramBucket> {
    let mut buckets: Vec<HistogramBucket> = edges
        .labels()
        .into_iter()
        .map(|label| HistogramBucket { label, count: 0 })
        .collect();
    for r in r_values(outcomes) {
        if let Some(bucket) = edges.bucket_of(r).and_then(|i| buckets.get_mut(i)) {
            bucket.count += 1;
        }
    }
    buckets
}

// ─── Corpus metrics ─────────────────────────────────────────────────

/// Report-level metrics for a corpus or one group of outcomes.
///
/// Counts and rates for wins/losses/break-even are sign-based over outcomes
/// with an R-multiple; `completed_trades` and `unknown` are label-based;
/// `expectancy` is the label-based evaluable mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusMetrics {
    /// All outcomes, resolved or not.
    pub sample_size: usize,
    /// WIN or LOSS labels.
    pub completed_trades: usize,
    /// UNKNOWN labels.
    pub unknown: usize,
    pub wins: usize,
    pub losses: usize,
    pub break_even: usize,
    pub win_rate: f64,
    pub loss_rate: f64,
    pub break_even_rate: f64,
    pub expectancy: f64,
    pub profit_factor: f64,
    pub average_r: f64,
    pub max_r: Option<f64>,
    pub min_r: Option<f64>,
    pub max_drawdown_r: f64,
    pub max_win_streak: usize,
    pub max_loss_streak: usize,
    pub average_mae: Option<f64>,
    pub average_mfe: Option<f64>,
    pub r_histogram: Vec<HistogramBucket>,
}

impl CorpusMetrics {
    /// Compute all metrics from outcomes in processing order.
    pub fn compute(outcomes: &[Outcome], edges: &HistogramEdges) -> Self {
        let rs = r_values(outcomes);
        let wins = rs.iter().filter(|&&r| r > 0.0).count();
        let losses = rs.iter().filter(|&&r| r < 0.0).count();
        let break_even = rs.iter().filter(|&&r| r == 0.0).count();
        let rate = |n: usize| {
            if rs.is_empty() {
                0.0
            } else {
                n as f64 / rs.len() as f64
            }
        };
        let (max_win_streak, max_loss_streak) = streaks(outcomes);

        Self {
            sample_size: outcomes.len(),
            completed_trades: outcomes
                .iter()
                .filter(|o| matches!(o.outcome, OutcomeKind::Win | OutcomeKind::Loss))
                .count(),
            unknown: outcomes
                .iter()
                .filter(|o| o.outcome == OutcomeKind::Unknown)
                .count(),
            wins,
            losses,
            break_even,
            win_rate: rate(wins),
            loss_rate: rate(losses),
            break_even_rate: rate(break_even),
            expectancy: expectancy(outcomes),
            profit_factor: profit_factor(outcomes),
            average_r: mean_f64(&rs),
            max_r: rs.iter().copied().reduce(f64::max),
            min_r: rs.iter().copied().reduce(f64::min),
            max_drawdown_r: max_drawdown_r(outcomes),
            max_win_streak,
            max_loss_streak,
            average_mae: average_mae(outcomes),
            average_mfe: average_mfe(outcomes),
            r_histogram: r_histogram(outcomes, edges),
        }
    }

    /// Copy with every float rounded to `decimals` places.
    pub fn rounded(&self, decimals: u32) -> Self {
        let round = |v: f64| round_to(v, decimals);
        Self {
            win_rate: round(self.win_rate),
            loss_rate: round(self.loss_rate),
            break_even_rate: round(self.break_even_rate),
            expectancy: round(self.expectancy),
            profit_factor: round(self.profit_factor),
            average_r: round(self.average_r),
            max_r: self.max_r.map(round),
            min_r: self.min_r.map(round),
            max_drawdown_r: round(self.max_drawdown_r),
            average_mae: self.average_mae.map(round),
            average_mfe: self.average_mfe.map(round),
            ..self.clone()
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Every R-multiple present, in input order, regardless of label.
fn r_values(outcomes: &[Outcome]) -> Vec<f64> {
    outcomes.iter().filter_map(|o| o.r_multiple).collect()
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn mean_present(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}
