//! Candle and signal ingestion.
//!
//! Both loaders validate every record, fail the whole load on the first bad
//! one, and return their records sorted ascending by timestamp.

pub mod candles;
pub mod error;
pub mod signals;
pub mod timestamp;

pub use candles::{load_candles, read_candles, REQUIRED_CANDLE_COLUMNS};
pub use error::LoadError;
pub use signals::{load_signals, read_signals};
pub use timestamp::{parse_timestamp, DEFAULT_TIMESTAMP_FORMAT};

/// Options shared by the candle and signal loaders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// chrono `strftime` format for timestamp fields. Values parsed without
    /// an offset are taken as UTC.
    pub timestamp_format: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl LoadOptions {
    pub fn with_timestamp_format(format: impl Into<String>) -> Self {
        Self {
            timestamp_format: format.into(),
        }
    }
}
