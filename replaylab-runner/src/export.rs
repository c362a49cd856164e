//! Reporting and export: JSON, JSONL, and Markdown artifact generation.
//!
//! - **JSON**: the replay report (metrics rounded to [`REPORT_DECIMALS`]) with schema versioning
//! - **JSONL**: one tagged outcome per line, unrounded
//! - **Markdown**: a human-readable summary and the grouped results table
//!
//! Persisted reports carry a `schema_version` field. Newer versions are
//! rejected on load.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;

use replaylab_core::domain::Outcome;

use crate::metrics::CorpusMetrics;
use crate::runner::{ReplayResult, SCHEMA_VERSION};

/// Decimal places for every metric float in the JSON report.
pub const REPORT_DECIMALS: u32 = 4;

pub const REPORT_JSON: &str = "report.json";
pub const REPORT_MARKDOWN: &str = "report.md";
pub const OUTCOMES_JSONL: &str = "outcomes.jsonl";

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `ReplayResult` to pretty JSON with metrics rounded.
pub fn export_json(result: &ReplayResult) -> Result<String> {
    serde_json::to_string_pretty(&result.rounded(REPORT_DECIMALS))
        .context("failed to serialize ReplayResult to JSON")
}

/// Deserialize a `ReplayResult` from JSON, rejecting unknown schema versions.
///
/// The returned result has no outcomes; read those with [`read_outcomes_jsonl`].
pub fn import_json(json: &str) -> Result<ReplayResult> {
    let result: ReplayResult =
        serde_json::from_str(json).context("failed to deserialize ReplayResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── JSONL outcomes ─────────────────────────────────────────────────

/// One compact JSON object per outcome, newline-terminated.
pub fn export_outcomes_jsonl(outcomes: &[Outcome]) -> Result<String> {
    let mut out = String::with_capacity(outcomes.len() * 160);
    for o in outcomes {
        let line = serde_json::to_string(o)
            .with_context(|| format!("failed to serialize outcome {}", o.signal_id))?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

/// Read an outcomes JSONL file. Blank lines are skipped.
pub fn read_outcomes_jsonl(path: &Path) -> Result<Vec<Outcome>> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut outcomes = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let outcome: Outcome = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid outcome", path.display(), i + 1))?;
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for a replay into `output_dir` (created if needed):
/// - `report.json`: rounded metrics, overall and per group
/// - `report.md`: the Markdown report
/// - `outcomes.jsonl`: every tagged outcome
///
/// Existing files are overwritten. Returns `output_dir`.
pub fn save_artifacts(result: &ReplayResult, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create artifact dir: {}", output_dir.display()))?;

    let json = export_json(result)?;
    write_artifact(&output_dir.join(REPORT_JSON), &json)?;

    write_artifact(&output_dir.join(REPORT_MARKDOWN), &generate_markdown(result))?;

    let jsonl = export_outcomes_jsonl(&result.outcomes)?;
    write_artifact(&output_dir.join(OUTCOMES_JSONL), &jsonl)?;

    info!(dir = %output_dir.display(), "saved replay artifacts");
    Ok(output_dir.to_path_buf())
}

/// Load a `ReplayResult` from an artifact directory, outcomes included.
pub fn load_artifacts(dir: &Path) -> Result<ReplayResult> {
    let report_path = dir.join(REPORT_JSON);
    let json = fs::read_to_string(&report_path)
        .with_context(|| format!("failed to read {}", report_path.display()))?;
    let mut result = import_json(&json)?;
    result.outcomes = read_outcomes_jsonl(&dir.join(OUTCOMES_JSONL))?;
    Ok(result)
}

fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate the Markdown report: metadata, overall metrics, R histogram,
/// and one table row per group in ranking order.
pub fn generate_markdown(result: &ReplayResult) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# Signal Replay Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Candles | {} |\n", result.candle_count));
    md.push_str(&format!("| Signals | {} |\n", result.signal_count));
    md.push_str(&format!("| Tie-break | {} |\n", result.tie_break));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    md.push('\n');

    let m = &result.overall;
    md.push_str("## Overall\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Signals | {} |\n", m.sample_size));
    md.push_str(&format!("| Completed Trades | {} |\n", m.completed_trades));
    md.push_str(&format!("| Unknown | {} |\n", m.unknown));
    md.push_str(&format!(
        "| Wins / Losses / BE | {} / {} / {} |\n",
        m.wins, m.losses, m.break_even
    ));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", m.win_rate * 100.0));
    md.push_str(&format!("| Expectancy | {:.4}R |\n", m.expectancy));
    md.push_str(&format!("| Profit Factor | {:.2} |\n", m.profit_factor));
    md.push_str(&format!("| Average R | {:.4} |\n", m.average_r));
    md.push_str(&format!("| Best R | {} |\n", fmt_opt(m.max_r)));
    md.push_str(&format!("| Worst R | {} |\n", fmt_opt(m.min_r)));
    md.push_str(&format!("| Max Drawdown | {:.4}R |\n", m.max_drawdown_r));
    md.push_str(&format!("| Max Win Streak | {} |\n", m.max_win_streak));
    md.push_str(&format!("| Max Loss Streak | {} |\n", m.max_loss_streak));
    md.push_str(&format!("| Average MAE | {} |\n", fmt_opt(m.average_mae)));
    md.push_str(&format!("| Average MFE | {} |\n", fmt_opt(m.average_mfe)));
    md.push('\n');

    md.push_str("## R Distribution\n\n");
    md.push_str(&histogram_table(m));
    md.push('\n');

    md.push_str("## Groups\n\n");
    if result.groups.is_empty() {
        md.push_str("_No signals._\n");
        return md;
    }
    md.push_str(
        "| Symbol | Timeframe | Session | Signal Type | Direction | N | Trades | Win% | Expectancy | Max DD | Max Loss Streak |\n",
    );
    md.push_str("| --- | --- | --- | --- | --- | ---: | ---: | ---: | ---: | ---: | ---: |\n");
    for row in &result.groups {
        let k = &row.key;
        let g = &row.metrics;
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {:.1} | {:.4} | {:.4} | {} |\n",
            k.symbol,
            k.timeframe,
            k.session.as_deref().unwrap_or("-"),
            k.signal_type.as_deref().unwrap_or("-"),
            k.direction,
            g.sample_size,
            g.completed_trades,
            g.win_rate * 100.0,
            g.expectancy,
            g.max_drawdown_r,
            g.max_loss_streak,
        ));
    }

    md
}

fn histogram_table(m: &CorpusMetrics) -> String {
    let mut md = String::new();
    md.push_str("| Bucket | Count |\n");
    md.push_str("| --- | ---: |\n");
    for bucket in &m.r_histogram {
        md.push_str(&format!("| {} | {} |\n", bucket.label, bucket.count));
    }
    md
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.4}"),
        None => "-".to_string(),
    }
}
