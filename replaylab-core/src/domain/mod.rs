//! Domain types for ReplayLab

pub mod candle;
pub mod outcome;
pub mod signal;

pub use candle::{Candle, CandleSeries};
pub use outcome::{Outcome, OutcomeKind};
pub use signal::{Direction, Signal};
