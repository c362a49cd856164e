//! Replay engine: turns signals plus candle history into outcomes.

pub mod tagger;

pub use tagger::{tag_outcomes, OutcomeTagger, TieBreak, TieBreakError};
