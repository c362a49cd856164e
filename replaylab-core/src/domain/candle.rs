//! Candle: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV candle at a single UTC instant.
///
/// No uniqueness is enforced: two candles may share a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Absent when the source has no volume column or the cell is empty.
    pub volume: Option<f64>,
}

impl Candle {
    /// Basic OHLC sanity check: high is the top of the range, low the bottom.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}

/// A candle sequence ordered non-decreasing by timestamp.
///
/// The constructor stable-sorts its input, so candles sharing a timestamp
/// keep their source order. The series is immutable once built and is
/// shared read-only by the tagger's workers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        Self { candles }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }

    /// Candles strictly after `ts`, ascending.
    ///
    /// Candles at exactly `ts` are excluded.
    pub fn after(&self, ts: DateTime<Utc>) -> &[Candle] {
        let start = self.candles.partition_point(|c| c.timestamp <= ts);
        &self.candles[start..]
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.candles.first().map(|c| c.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.candles.last().map(|c| c.timestamp)
    }
}

impl From<Vec<Candle>> for CandleSeries {
    fn from(candles: Vec<Candle>) -> Self {
        Self::new(candles)
    }
}

impl<'a> IntoIterator for &'a CandleSeries {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candle_at(minute: u32, close: f64) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 9, minute, 0).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: None,
        }
    }

    #[test]
    fn candle_is_sane() {
        assert!(candle_at(0, 100.0).is_sane());
    }

    #[test]
    fn candle_detects_insane_high_low() {
        let mut c = candle_at(0, 100.0);
        c.high = 98.0; // below low
        assert!(!c.is_sane());
    }

    #[test]
    fn series_sorts_on_construction() {
        let series = CandleSeries::new(vec![
            candle_at(5, 105.0),
            candle_at(1, 101.0),
            candle_at(3, 103.0),
        ]);
        let closes: Vec<f64> = series.iter().map(|c| c.close).collect();
        assert_eq!(closes, vec![101.0, 103.0, 105.0]);
    }

    #[test]
    fn series_sort_is_stable_for_duplicates() {
        let series = CandleSeries::new(vec![
            candle_at(2, 1.0),
            candle_at(1, 0.0),
            candle_at(2, 2.0),
        ]);
        let closes: Vec<f64> = series.iter().map(|c| c.close).collect();
        assert_eq!(closes, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn after_excludes_equal_timestamp() {
        let series = CandleSeries::new(vec![
            candle_at(0, 100.0),
            candle_at(1, 101.0),
            candle_at(2, 102.0),
        ]);
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 9, 1, 0).unwrap();
        let rest = series.after(ts);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].close, 102.0);
    }

    #[test]
    fn first_and_last_timestamps() {
        assert_eq!(CandleSeries::default().first_timestamp(), None);
        let series = CandleSeries::new(vec![candle_at(4, 1.0), candle_at(2, 2.0)]);
        assert_eq!(series.first_timestamp(), Some(candle_at(2, 0.0).timestamp));
        assert_eq!(series.last_timestamp(), Some(candle_at(4, 0.0).timestamp));
    }

    #[test]
    fn after_past_end_is_empty() {
        let series = CandleSeries::new(vec![candle_at(0, 100.0)]);
        let ts = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert!(series.after(ts).is_empty());
    }
}
