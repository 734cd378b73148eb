//! Order lifecycle engine.
//!
//! Drives one symbol against a [`Venue`](band_trade_core::Venue)
//! implementation on a polling cadence:
//!
//! - Re-reads the live position every tick and treats the venue as truth
//! - Brackets positions discovered without protective exits
//! - Gates re-entry behind a cooldown after each accepted entry
//! - Scans, sizes, and submits entries from the configured signal policy
//! - Backs off and rebuilds the venue session after transport faults
//!
//! # Example
//!
//! ```ignore
//! use band_trade_core::ConfigLoader;
//! use band_trade_engine::TradeEngine;
//!
//! let config = ConfigLoader::load()?;
//! let venue = band_trade_bybit::BybitVenue::from_config(&config.bybit)?;
//! let mut engine = TradeEngine::start(venue, &config).await?;
//! engine.run().await?;
//! ```

pub mod bracket;
pub mod engine;

pub use bracket::{attach_with_retry, plan_entry_bracket, plan_position_bracket};
pub use engine::{EngineError, TradeEngine};
