pub mod indicators;
pub mod signal;

pub use indicators::{band_reference, snapshot, BandReference, IndicatorParams, IndicatorSnapshot};
pub use signal::{NoTradeReason, Signal, SignalEngine};
