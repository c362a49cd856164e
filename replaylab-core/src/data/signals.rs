//! JSONL signal loader: one JSON object per line.
//!
//! Field coercion rules:
//! - `signal_id` missing → `sig_<line>`; numeric ids are kept as their text
//! - `direction` is case-folded, then must be `long` or `short`
//! - `entry`, `sl`, `tp` accept numbers or numeric strings; missing → `0.0`
//! - `session`, `signal_type` missing → `None`; `meta` missing → empty map

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use super::error::LoadError;
use super::timestamp::parse_timestamp;
use super::LoadOptions;
use crate::domain::{Direction, Signal};

type Object = Map<String, Value>;

/// Load signals from a JSONL file, sorted ascending by timestamp.
pub fn load_signals(path: &Path, opts: &LoadOptions) -> Result<Vec<Signal>, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path)?;
    let signals = read_signals(BufReader::new(file), &path.display().to_string(), opts)?;
    debug!(path = %path.display(), signals = signals.len(), "loaded signals");
    Ok(signals)
}

/// Parse signals from any line reader. `source_name` labels errors.
pub fn read_signals<R: BufRead>(
    reader: R,
    source_name: &str,
    opts: &LoadOptions,
) -> Result<Vec<Signal>, LoadError> {
    let mut signals = Vec::new();

    for (i, bytes) in reader.split(b'\n').enumerate() {
        let line_no = i + 1;
        let mut bytes = bytes?;
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        let line = String::from_utf8(bytes).map_err(|e| LoadError::LineParse {
            line: line_no,
            raw: String::from_utf8_lossy(e.as_bytes()).into_owned(),
            reason: format!("invalid UTF-8: {}", e.utf8_error()),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let signal = parse_line(&line, line_no, opts).map_err(|reason| LoadError::LineParse {
            line: line_no,
            raw: line.clone(),
            reason,
        })?;
        signals.push(signal);
    }

    if signals.is_empty() {
        return Err(LoadError::NoSignals {
            source_name: source_name.to_string(),
        });
    }

    signals.sort_by_key(|s| s.timestamp);
    Ok(signals)
}

fn parse_line(line: &str, line_no: usize, opts: &LoadOptions) -> Result<Signal, String> {
    let value: Value = serde_json::from_str(line).map_err(|e| format!("invalid JSON: {e}"))?;
    let Value::Object(obj) = value else {
        return Err("expected a JSON object".into());
    };

    let signal_id = match obj.get("signal_id") {
        None | Some(Value::Null) => format!("sig_{line_no}"),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => return Err(format!("signal_id must be a string, got {other}")),
    };

    let raw_ts = opt_string(&obj, "timestamp")?.ok_or("missing timestamp")?;
    let timestamp = parse_timestamp(&raw_ts, &opts.timestamp_format)?;

    let direction: Direction = opt_string(&obj, "direction")?
        .unwrap_or_default()
        .to_lowercase()
        .parse()?;

    let meta = match obj.get("meta") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(m)) => m.clone(),
        Some(other) => return Err(format!("meta must be an object, got {other}")),
    };

    Ok(Signal {
        signal_id,
        timestamp,
        symbol: opt_string(&obj, "symbol")?.unwrap_or_default(),
        timeframe: opt_string(&obj, "timeframe")?.unwrap_or_default(),
        direction,
        signal_type: opt_string(&obj, "signal_type")?,
        entry: number_or_zero(&obj, "entry")?,
        sl: number_or_zero(&obj, "sl")?,
        tp: number_or_zero(&obj, "tp")?,
        session: opt_string(&obj, "session")?,
        meta,
    })
}

fn opt_string(obj: &Object, key: &str) -> Result<Option<String>, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(format!("{key} must be a string, got {other}")),
    }
}

fn number_or_zero(obj: &Object, key: &str) -> Result<f64, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| format!("{key} is not representable as f64: {n}")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid {key} '{s}': {e}")),
        Some(other) => Err(format!("{key} must be a number, got {other}")),
    }
}
