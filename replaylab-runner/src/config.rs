//! TOML replay configuration.
//!
//! Every section and field has a default, so an empty file is a valid
//! config. Paths may be overridden afterwards (the CLI does this).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use replaylab_core::data::{LoadOptions, DEFAULT_TIMESTAMP_FORMAT};
use replaylab_core::engine::{TieBreak, TieBreakError};

use crate::metrics::HistogramEdges;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    TieBreak(#[from] TieBreakError),

    #[error("invalid histogram edges: {0}")]
    Histogram(String),

    #[error("missing {0} path (set it in the config or on the command line)")]
    MissingPath(&'static str),
}

/// Full replay configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub data: DataConfig,
    pub tagging: TaggingConfig,
    pub report: ReportConfig,
}

/// `[data]`: input locations and parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub candles: Option<PathBuf>,
    pub signals: Option<PathBuf>,
    pub timestamp_format: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            candles: None,
            signals: None,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

/// `[tagging]`: tie-break rule and parallelism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggingConfig {
    /// Kept as text so unsupported values surface as a config error rather
    /// than a serde one.
    pub tie_break: String,
    /// Worker threads for tagging; 0 uses rayon's global pool.
    pub threads: usize,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::default().to_string(),
            threads: 0,
        }
    }
}

/// `[report]`: artifact location and histogram buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    pub histogram_negative_edges: Vec<f64>,
    pub histogram_positive_edges: Vec<f64>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let edges = HistogramEdges::default();
        Self {
            output_dir: PathBuf::from("reports"),
            histogram_negative_edges: edges.negative,
            histogram_positive_edges: edges.positive,
        }
    }
}

impl ReplayConfig {
    /// Read and validate a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: ReplayConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check tie-break and histogram settings. Input paths are checked
    /// later, by [`ReplayConfig::input_paths`], since the CLI may fill them in.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tie_break()?;
        self.histogram_edges()?;
        Ok(())
    }

    pub fn tie_break(&self) -> Result<TieBreak, ConfigError> {
        Ok(self.tagging.tie_break.parse()?)
    }

    pub fn histogram_edges(&self) -> Result<HistogramEdges, ConfigError> {
        HistogramEdges::new(
            self.report.histogram_negative_edges.clone(),
            self.report.histogram_positive_edges.clone(),
        )
        .map_err(ConfigError::Histogram)
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions::with_timestamp_format(self.data.timestamp_format.clone())
    }

    /// `(candles, signals)` paths, both required.
    pub fn input_paths(&self) -> Result<(&Path, &Path), ConfigError> {
        let candles = self
            .data
            .candles
            .as_deref()
            .ok_or(ConfigError::MissingPath("candles"))?;
        let signals = self
            .data
            .signals
            .as_deref()
            .ok_or(ConfigError::MissingPath("signals"))?;
        Ok((candles, signals))
    }
}
