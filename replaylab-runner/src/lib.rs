//! ReplayLab Runner: metrics, grouping, configuration, and reporting.
//!
//! This crate builds on `replaylab-core` to provide:
//! - R-multiple metrics over tagged outcomes (label- and sign-based)
//! - Batch aggregation by symbol, timeframe, session, signal type, direction
//! - TOML replay configuration
//! - The replay pipeline: load, tag, pair, aggregate
//! - JSON / JSONL / Markdown artifacts

pub mod batch;
pub mod config;
pub mod export;
pub mod metrics;
pub mod runner;

pub use batch::{pair_outcomes, BatchReport, GroupKey, GroupRow};
pub use config::{ConfigError, ReplayConfig};
pub use export::{
    export_json, export_outcomes_jsonl, generate_markdown, read_outcomes_jsonl, save_artifacts,
    REPORT_DECIMALS,
};
pub use metrics::{CorpusMetrics, GroupSummary, HistogramBucket, HistogramEdges};
pub use runner::{run_replay, run_replay_from_data, ReplayResult, RunError, SCHEMA_VERSION};
