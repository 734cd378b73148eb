//! Order-side types exchanged between the decision loop and the venue.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
}

/// Venue time-in-force for entry orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    GoodTilCanceled,
    PostOnly,
    ImmediateOrCancel,
}

/// Desired entry produced by a signal policy, before sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub side: Side,
    pub entry_price: Decimal,
    pub stop_price: Decimal,
}

/// A fully quantized order, ready for the venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    /// Required for limit orders, ignored for market orders.
    pub limit_price: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub time_in_force: TimeInForce,
}

/// Venue answer to an order submission.
///
/// `accepted == false` is an application-level rejection, distinct from a
/// transport failure (which surfaces as a `VenueError`).
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAck {
    pub accepted: bool,
    pub order_id: Option<String>,
    pub error_message: Option<String>,
}

impl OrderAck {
    #[must_use]
    pub fn accepted(order_id: impl Into<String>) -> Self {
        Self {
            accepted: true,
            order_id: Some(order_id.into()),
            error_message: None,
        }
    }

    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            order_id: None,
            error_message: Some(message.into()),
        }
    }
}

/// Protective exit pair attached to an open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketOrder {
    pub take_profit: Decimal,
    pub stop_loss: Decimal,
}

/// Venue answer to a bracket attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketAck {
    pub accepted: bool,
    pub error_message: Option<String>,
}

impl BracketAck {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            accepted: true,
            error_message: None,
        }
    }

    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            error_message: Some(message.into()),
        }
    }
}
