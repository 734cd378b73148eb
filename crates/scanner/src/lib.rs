//! Multi-symbol opportunity scanner.
//!
//! Evaluates a watch list with the same indicators and signal policies
//! as the single-symbol engine, ranks the setups that fire by Bollinger
//! bandwidth, and trades the widest one, holding at most one position
//! across the whole account.
//!
//! # Example
//!
//! ```ignore
//! use band_trade_core::ConfigLoader;
//! use band_trade_scanner::ScanRunner;
//!
//! let config = ConfigLoader::load()?;
//! let venue = band_trade_bybit::BybitVenue::from_config(&config.bybit)?;
//! let mut runner = ScanRunner::new(venue, config)?;
//! runner.run().await?;
//! ```

pub mod runner;
pub mod scan;

pub use runner::ScanRunner;
pub use scan::{best_opportunity, evaluate_symbol, Opportunity};
