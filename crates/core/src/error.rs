//! Error taxonomy for the trading engine.
//!
//! Components surface typed failures and leave recovery policy to the
//! lifecycle engine: candle-series problems abort the current tick, venue
//! transport problems trigger the engine's backoff-and-reconnect path, and
//! invalid instrument rules are fatal at startup.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised when talking to a trading venue.
#[derive(Debug, Error)]
pub enum VenueError {
    /// The venue answered with a non-zero application status code.
    #[error("venue API error {code}: {message}")]
    Api {
        /// Venue status code (`retCode` on Bybit).
        code: i64,
        /// Error message from the venue.
        message: String,
    },

    /// Network-level failure before a response was received.
    #[error("network error: {0}")]
    Network(String),

    /// Request timed out.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Authentication or request signing failed.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// The venue responded but the payload did not parse.
    #[error("malformed venue response: {0}")]
    Malformed(String),

    /// The venue does not know the requested instrument.
    #[error("instrument not available: {symbol}")]
    InstrumentUnavailable {
        /// Symbol the venue rejected.
        symbol: String,
    },
}

impl VenueError {
    /// Creates an API error from a venue status code and message.
    pub fn api(code: i64, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
        }
    }

    /// Creates a malformed-response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Creates an instrument-not-available error.
    pub fn instrument_unavailable(symbol: impl Into<String>) -> Self {
        Self::InstrumentUnavailable {
            symbol: symbol.into(),
        }
    }

    /// Returns true when a later identical request could succeed.
    ///
    /// Bybit codes 10006 (rate limit) and 10016 (internal/busy) are
    /// transient; everything else application-level is not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Api { code, .. } => matches!(code, 10006 | 10016),
            _ => false,
        }
    }
}

/// Failures while building a usable candle series.
///
/// These abort the current tick's scan and nothing else.
#[derive(Debug, Error)]
pub enum SeriesError {
    /// The venue returned no rows at all.
    #[error("venue returned an empty candle list")]
    Empty,

    /// Too few rows survived parsing to run the indicators.
    #[error("only {got} usable candles, need at least {need}")]
    Insufficient { got: usize, need: usize },
}

/// Instrument-rule violations detected by the quantizer.
///
/// Rules are validated once at startup; hitting this later means the
/// configuration was never sane, so callers treat it as fatal.
#[derive(Debug, Error)]
pub enum QuantizeError {
    #[error("invalid instrument rule: {field} must be positive, got {value}")]
    InvalidInstrumentRule { field: &'static str, value: Decimal },
}
