//! Load-time error taxonomy.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading candles or signals.
///
/// Every variant is fatal for the load: there is no partial or best-effort
/// result.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("missing required columns {missing:?} (found {found:?})")]
    Schema {
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("row {row}: {reason} (raw: '{raw}')")]
    RowParse {
        row: usize,
        raw: String,
        reason: String,
    },

    #[error("line {line}: {reason} (raw: '{raw}')")]
    LineParse {
        line: usize,
        raw: String,
        reason: String,
    },

    #[error("no candle rows in {source_name}")]
    NoRows { source_name: String },

    #[error("no signals in {source_name}")]
    NoSignals { source_name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
