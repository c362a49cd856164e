//! ReplayLab Core: domain types, candle/signal ingestion, outcome tagging.
//!
//! This crate contains the offline replay core:
//! - Domain types (candles, signals, outcomes)
//! - CSV candle and JSONL signal loaders with strict validation
//! - The outcome tagger: per-signal stop/target simulation with R-multiple,
//!   MAE and MFE accounting

pub mod data;
pub mod domain;
pub mod engine;

pub use data::{load_candles, load_signals, LoadError, LoadOptions};
pub use domain::{Candle, CandleSeries, Direction, Outcome, OutcomeKind, Signal};
pub use engine::{tag_outcomes, OutcomeTagger, TieBreak};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the types handed to rayon workers and shared
    /// across threads are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Candle>();
        require_sync::<Candle>();
        require_send::<CandleSeries>();
        require_sync::<CandleSeries>();
        require_send::<Signal>();
        require_sync::<Signal>();
        require_send::<Outcome>();
        require_sync::<Outcome>();
        require_send::<OutcomeTagger<'static>>();
        require_sync::<OutcomeTagger<'static>>();
        require_send::<LoadError>();
        require_sync::<LoadError>();
    }

    /// Architecture contract: the tagger borrows the candle series immutably.
    ///
    /// `OutcomeTagger::new` takes `&CandleSeries`; if it ever needs `&mut`,
    /// this stops compiling.
    #[test]
    fn tagger_borrows_candles_immutably() {
        fn _check(series: &CandleSeries, signals: &[Signal]) -> Vec<Outcome> {
            OutcomeTagger::new(series).tag(signals)
        }
    }
}
