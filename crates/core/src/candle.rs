//! Candle data and the chronology-normalizing series wrapper.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SeriesError;

/// A single OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    /// Returns false when the OHLC values contradict each other.
    #[must_use]
    pub fn is_coherent(&self) -> bool {
        self.high >= self.open.max(self.close) && self.low <= self.open.min(self.close)
    }
}

/// Chronologically ordered candle history, oldest first.
///
/// Venues serve klines newest-first. [`CandleSeries::from_newest_first`]
/// reverses them, drops duplicate bars (the freshest served revision of an
/// `open_time` wins), and refuses to produce a series too short for the
/// indicator windows.
#[derive(Debug, Clone)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Builds a series from venue rows in newest-first order.
    ///
    /// # Errors
    ///
    /// [`SeriesError::Empty`] when `rows` is empty,
    /// [`SeriesError::Insufficient`] when fewer than `min_len` distinct bars
    /// remain after deduplication.
    pub fn from_newest_first(rows: Vec<Candle>, min_len: usize) -> Result<Self, SeriesError> {
        if rows.is_empty() {
            return Err(SeriesError::Empty);
        }

        // Newest-first means the first row seen for an open_time is the
        // freshest revision of that bar.
        let mut seen = HashSet::with_capacity(rows.len());
        let mut candles: Vec<Candle> = rows
            .into_iter()
            .filter(|row| seen.insert(row.open_time))
            .collect();
        candles.reverse();

        if candles.len() < min_len {
            return Err(SeriesError::Insufficient {
                got: candles.len(),
                need: min_len,
            });
        }

        Ok(Self { candles })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// All bars, oldest first.
    #[must_use]
    pub fn bars(&self) -> &[Candle] {
        &self.candles
    }

    /// The most recent bar.
    #[must_use]
    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// The bar one before the most recent.
    #[must_use]
    pub fn prev(&self) -> Option<&Candle> {
        self.candles.len().checked_sub(2).map(|i| &self.candles[i])
    }

    /// Close prices, oldest first.
    #[must_use]
    pub fn closes(&self) -> Vec<Decimal> {
        self.candles.iter().map(|c| c.close).collect()
    }
}
