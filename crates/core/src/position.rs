use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::order::Side;

/// Venue-reported state of one symbol's position.
///
/// The engine never caches this across ticks; it is re-read from the venue
/// before every decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    pub symbol: String,
    /// `None` when flat.
    pub side: Option<Side>,
    pub size: Decimal,
    pub avg_entry_price: Decimal,
    /// Whether the venue reports protective take-profit/stop-loss levels.
    pub bracketed: bool,
}

impl PositionState {
    #[must_use]
    pub fn flat(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            side: None,
            size: Decimal::ZERO,
            avg_entry_price: Decimal::ZERO,
            bracketed: false,
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.size > Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_flat_position() {
        let pos = PositionState::flat("BTCUSDT");
        assert!(!pos.is_open());
        assert_eq!(pos.side, None);
        assert_eq!(pos.size, dec!(0));
    }

    #[test]
    fn test_open_position() {
        let pos = PositionState {
            symbol: "BTCUSDT".to_string(),
            side: Some(Side::Buy),
            size: dec!(0.5),
            avg_entry_price: dec!(60000),
            bracketed: true,
        };
        assert!(pos.is_open());
    }
}
