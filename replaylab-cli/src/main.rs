//! ReplayLab CLI: tag signals and build replay reports.
//!
//! Commands:
//! - `tag`: replay signals over candles and write outcomes as JSONL
//! - `report`: run the full pipeline from a TOML config and save artifacts
//!
//! Logging goes to stderr and is filtered by `RUST_LOG` (default `info`).

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use replaylab_core::data::{load_candles, load_signals, LoadOptions, DEFAULT_TIMESTAMP_FORMAT};
use replaylab_core::engine::{tag_outcomes, TieBreak};
use replaylab_runner::{export_outcomes_jsonl, run_replay, save_artifacts, ReplayConfig, ReplayResult};

#[derive(Parser)]
#[command(
    name = "replaylab",
    about = "ReplayLab CLI: offline signal replay and outcome metrics"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay signals over candles and write one outcome per line.
    Tag {
        /// Candle CSV (timestamp,open,high,low,close[,volume]).
        #[arg(long)]
        candles: PathBuf,

        /// Signal JSONL, one object per line.
        #[arg(long)]
        signals: PathBuf,

        /// chrono format for timestamps in both files.
        #[arg(long, default_value = DEFAULT_TIMESTAMP_FORMAT)]
        timestamp_format: String,

        /// Rule for a candle that hits stop and target. Only `loss` is supported.
        #[arg(long, default_value = "loss")]
        tie_break: String,

        /// Output file. Defaults to stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run the full replay pipeline and save report artifacts.
    Report {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Candle CSV (overrides `[data] candles`).
        #[arg(long)]
        candles: Option<PathBuf>,

        /// Signal JSONL (overrides `[data] signals`).
        #[arg(long)]
        signals: Option<PathBuf>,

        /// Artifact directory (overrides `[report] output_dir`).
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Tag {
            candles,
            signals,
            timestamp_format,
            tie_break,
            out,
        } => run_tag(candles, signals, timestamp_format, &tie_break, out),
        Commands::Report {
            config,
            candles,
            signals,
            output_dir,
        } => run_report(config, candles, signals, output_dir),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_tag(
    candles: PathBuf,
    signals: PathBuf,
    timestamp_format: String,
    tie_break: &str,
    out: Option<PathBuf>,
) -> Result<()> {
    let tie_break: TieBreak = tie_break.parse()?;
    let opts = LoadOptions::with_timestamp_format(timestamp_format);

    let candles = load_candles(&candles, &opts)
        .with_context(|| format!("failed to load candles from {}", candles.display()))?;
    let signals = load_signals(&signals, &opts)
        .with_context(|| format!("failed to load signals from {}", signals.display()))?;

    let outcomes = tag_outcomes(&signals, &candles, tie_break);
    let jsonl = export_outcomes_jsonl(&outcomes)?;

    match out {
        Some(path) => {
            std::fs::write(&path, &jsonl)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(outcomes = outcomes.len(), path = %path.display(), "wrote outcomes");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(jsonl.as_bytes())
                .context("failed to write outcomes to stdout")?;
        }
    }
    Ok(())
}

fn run_report(
    config_path: Option<PathBuf>,
    candles: Option<PathBuf>,
    signals: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => ReplayConfig::from_file(path)?,
        None => ReplayConfig::default(),
    };
    if candles.is_some() {
        config.data.candles = candles;
    }
    if signals.is_some() {
        config.data.signals = signals;
    }
    if let Some(dir) = output_dir {
        config.report.output_dir = dir;
    }

    let result = run_replay(&config)?;
    let dir = save_artifacts(&result, &config.report.output_dir)?;

    print_summary(&result);
    println!();
    println!("Artifacts saved to: {}", dir.display());
    Ok(())
}

fn print_summary(result: &ReplayResult) {
    let m = &result.overall;
    println!();
    println!("=== Replay Result ===");
    println!("Candles:         {}", result.candle_count);
    println!("Signals:         {}", result.signal_count);
    println!("Tie-break:       {}", result.tie_break);
    println!("Dataset Hash:    {}", result.dataset_hash);
    println!();
    println!("--- Outcomes ---");
    println!("Completed:       {}", m.completed_trades);
    println!("Unknown:         {}", m.unknown);
    println!(
        "W / L / BE:      {} / {} / {}",
        m.wins, m.losses, m.break_even
    );
    println!("Win Rate:        {:.1}%", m.win_rate * 100.0);
    println!("Expectancy:      {:.4}R", m.expectancy);
    println!("Profit Factor:   {:.2}", m.profit_factor);
    println!("Max Drawdown:    {:.4}R", m.max_drawdown_r);
    println!("Max Win Streak:  {}", m.max_win_streak);
    println!("Max Loss Streak: {}", m.max_loss_streak);
    println!();
    println!("--- Top Groups ---");
    for row in result.groups.iter().take(5) {
        println!(
            "{:<40} N={:<5} exp={:>8.4}R win={:>5.1}%",
            row.key.to_string(),
            row.metrics.sample_size,
            row.metrics.expectancy,
            row.metrics.win_rate * 100.0
        );
    }
}
