//! CSV candle loader.
//!
//! Expected header: `timestamp,open,high,low,close[,volume]` in any column
//! order. The schema is checked before any row is read; rows are then parsed
//! strictly and the first bad row fails the load.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

use super::error::LoadError;
use super::timestamp::parse_timestamp;
use super::LoadOptions;
use crate::domain::{Candle, CandleSeries};

/// Columns every candle source must carry.
pub const REQUIRED_CANDLE_COLUMNS: [&str; 5] = ["timestamp", "open", "high", "low", "close"];

/// Optional volume column name.
pub const VOLUME_COLUMN: &str = "volume";

/// Column positions resolved from the header.
struct ColumnIndex {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, LoadError> {
        let found: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();
        let position = |name: &str| found.iter().position(|h| h == name);

        let missing: Vec<String> = REQUIRED_CANDLE_COLUMNS
            .iter()
            .filter(|name| position(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(LoadError::Schema { missing, found });
        }

        // All required columns were found above.
        let required = |name: &str| position(name).unwrap_or_default();
        Ok(Self {
            timestamp: required("timestamp"),
            open: required("open"),
            high: required("high"),
            low: required("low"),
            close: required("close"),
            volume: position(VOLUME_COLUMN),
        })
    }
}

/// Load candles from a CSV file.
///
/// The file handle lives only for the duration of this call and is released
/// on every exit path, including parse failures.
pub fn load_candles(path: &Path, opts: &LoadOptions) -> Result<CandleSeries, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path)?;
    let series = read_candles(file, &path.display().to_string(), opts)?;
    debug!(
        path = %path.display(),
        candles = series.len(),
        first = ?series.first_timestamp(),
        last = ?series.last_timestamp(),
        "loaded candles"
    );
    Ok(series)
}

/// Parse candles from any CSV reader. `source_name` labels errors.
pub fn read_candles<R: Read>(
    reader: R,
    source_name: &str,
    opts: &LoadOptions,
) -> Result<CandleSeries, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(LoadError::NoRows {
            source_name: source_name.to_string(),
        });
    }
    let columns = ColumnIndex::resolve(&headers)?;

    let mut candles = Vec::new();
    for (i, record) in rdr.byte_records().enumerate() {
        let row = i + 1;
        let record = csv::StringRecord::from_byte_record(record?).map_err(|e| {
            let reason = format!("invalid UTF-8: {}", e.utf8_error());
            let record = e.into_byte_record();
            let raw: Vec<_> = record.iter().map(String::from_utf8_lossy).collect();
            LoadError::RowParse {
                row,
                raw: raw.join(","),
                reason,
            }
        })?;
        candles.push(parse_row(&record, row, &columns, opts)?);
    }

    if candles.is_empty() {
        return Err(LoadError::NoRows {
            source_name: source_name.to_string(),
        });
    }

    let inconsistent = candles.iter().filter(|c| !c.is_sane()).count();
    if inconsistent > 0 {
        warn!(
            source = source_name,
            inconsistent,
            "candles with high/low outside the open/close range"
        );
    }

    Ok(CandleSeries::new(candles))
}

fn parse_row(
    record: &csv::StringRecord,
    row: usize,
    columns: &ColumnIndex,
    opts: &LoadOptions,
) -> Result<Candle, LoadError> {
    let row_error = |reason: String| LoadError::RowParse {
        row,
        raw: record.iter().collect::<Vec<_>>().join(","),
        reason,
    };

    let field = |idx: usize, name: &str| {
        record
            .get(idx)
            .ok_or_else(|| row_error(format!("missing field '{name}'")))
    };
    let number = |idx: usize, name: &str| -> Result<f64, LoadError> {
        let raw = field(idx, name)?;
        raw.trim()
            .parse::<f64>()
            .map_err(|e| row_error(format!("invalid {name} '{raw}': {e}")))
    };

    let timestamp = parse_timestamp(field(columns.timestamp, "timestamp")?, &opts.timestamp_format)
        .map_err(&row_error)?;

    let volume = match columns.volume.and_then(|idx| record.get(idx)) {
        Some(raw) if !raw.trim().is_empty() => Some(
            raw.trim()
                .parse::<f64>()
                .map_err(|e| row_error(format!("invalid volume '{raw}': {e}")))?,
        ),
        _ => None,
    };

    Ok(Candle {
        timestamp,
        open: number(columns.open, "open")?,
        high: number(columns.high, "high")?,
        low: number(columns.low, "low")?,
        close: number(columns.close, "close")?,
        volume,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn read(csv: &str) -> Result<CandleSeries, LoadError> {
        read_candles(csv.as_bytes(), "<test>", &LoadOptions::default())
    }

    #[test]
    fn parses_and_sorts_rows() {
        let series = read(
            "timestamp,open,high,low,close,volume\n\
             2024-01-02 09:02:00,101,102,100,101.5,10\n\
             2024-01-02 09:01:00,100,101,99,100.5,12\n",
        )
        .unwrap();
        assert_eq!(series.len(), 2);
        let first = &series.as_slice()[0];
        assert_eq!(
            first.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 2, 9, 1, 0).unwrap()
        );
        assert_eq!(first.volume, Some(12.0));
    }

    #[test]
    fn volume_is_optional() {
        let series = read("timestamp,open,high,low,close\n2024-01-02 09:00:00,1,2,0.5,1.5\n").unwrap();
        assert_eq!(series.as_slice()[0].volume, None);
    }

    #[test]
    fn empty_volume_cell_is_none() {
        let series =
            read("timestamp,open,high,low,close,volume\n2024-01-02 09:00:00,1,2,0.5,1.5,\n")
                .unwrap();
        assert_eq!(series.as_slice()[0].volume, None);
    }

    #[test]
    fn column_order_is_free() {
        let series = read("close,low,high,open,timestamp\n1.5,0.5,2,1,2024-01-02 09:00:00\n").unwrap();
        let c = &series.as_slice()[0];
        assert_eq!((c.open, c.high, c.low, c.close), (1.0, 2.0, 0.5, 1.5));
    }

    #[test]
    fn missing_columns_are_named() {
        let err = read("timestamp,open,close\n2024-01-02 09:00:00,1,1\n").unwrap_err();
        match err {
            LoadError::Schema { missing, found } => {
                assert_eq!(missing, vec!["high".to_string(), "low".to_string()]);
                assert_eq!(found, vec!["timestamp", "open", "close"]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn bad_number_reports_row_and_raw() {
        let err = read(
            "timestamp,open,high,low,close\n\
             2024-01-02 09:00:00,1,2,0.5,1.5\n\
             2024-01-02 09:01:00,1,abc,0.5,1.5\n",
        )
        .unwrap_err();
        match err {
            LoadError::RowParse { row, raw, reason } => {
                assert_eq!(row, 2);
                assert_eq!(raw, "2024-01-02 09:01:00,1,abc,0.5,1.5");
                assert!(reason.contains("high"));
            }
            other => panic!("expected row error, got {other:?}"),
        }
    }

    #[test]
    fn bad_timestamp_is_row_error() {
        let err = read("timestamp,open,high,low,close\n02/01/2024,1,2,0.5,1.5\n").unwrap_err();
        assert!(matches!(err, LoadError::RowParse { row: 1, .. }));
    }

    #[test]
    fn short_row_is_row_error() {
        let err = read("timestamp,open,high,low,close\n2024-01-02 09:00:00,1,2\n").unwrap_err();
        assert!(matches!(err, LoadError::RowParse { row: 1, .. }));
    }

    #[test]
    fn invalid_utf8_row_keeps_raw_text() {
        let mut src = b"timestamp,open,high,low,close\n2024-01-02 09:00:00,1,2,0.5,1.5\n".to_vec();
        src.extend_from_slice(b"2024-01-02 09:05:00,1\xFF,2,0.5,1.5\n");
        let err = read_candles(src.as_slice(), "<test>", &LoadOptions::default()).unwrap_err();
        match err {
            LoadError::RowParse { row, raw, reason } => {
                assert_eq!(row, 2);
                assert_eq!(raw, "2024-01-02 09:05:00,1\u{FFFD},2,0.5,1.5");
                assert!(reason.contains("UTF-8"));
            }
            other => panic!("expected row error, got {other:?}"),
        }
    }

    #[test]
    fn inconsistent_ohlc_is_kept() {
        let series = read("timestamp,open,high,low,close\n2024-01-02 09:00:00,1,0.5,2,1.5\n").unwrap();
        assert_eq!(series.len(), 1);
        assert!(!series.as_slice()[0].is_sane());
    }

    #[test]
    fn header_only_is_no_rows() {
        let err = read("timestamp,open,high,low,close\n").unwrap_err();
        assert!(matches!(err, LoadError::NoRows { .. }));
    }

    #[test]
    fn empty_source_is_no_rows() {
        let err = read("").unwrap_err();
        assert!(matches!(err, LoadError::NoRows { .. }));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_candles(
            Path::new("/definitely/not/here/candles.csv"),
            &LoadOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candles.csv");
        std::fs::write(
            &path,
            "timestamp,open,high,low,close\n2024-01-02 09:00:00,1,2,0.5,1.5\n",
        )
        .unwrap();
        let series = load_candles(&path, &LoadOptions::default()).unwrap();
        assert_eq!(series.len(), 1);
    }
}
