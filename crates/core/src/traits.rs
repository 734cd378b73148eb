use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::candle::Candle;
use crate::error::VenueError;
use crate::instrument::InstrumentRules;
use crate::order::{BracketAck, BracketOrder, OrderAck, OrderRequest};
use crate::position::PositionState;

/// Venue operations the decision loop depends on.
///
/// Queries return [`VenueError`] for transport and protocol failures. Order
/// placement distinguishes venue rejection (an unaccepted ack) from
/// transport failure (`Err`), so callers can abort without retrying the
/// former and back off on the latter.
#[async_trait]
pub trait Venue: Send + Sync {
    /// Step constraints for a symbol. Unknown symbols are an error.
    async fn instrument_rules(&self, symbol: &str) -> Result<InstrumentRules, VenueError>;

    /// Recent candles in venue order, newest first.
    async fn candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, VenueError>;

    /// Last traded price.
    async fn last_price(&self, symbol: &str) -> Result<Decimal, VenueError>;

    /// Balance available for new orders; zero when the venue reports none.
    async fn available_balance(&self, coin: &str) -> Result<Decimal, VenueError>;

    /// Current position for a symbol; flat positions have size zero.
    async fn position(&self, symbol: &str) -> Result<PositionState, VenueError>;

    /// First open position across all symbols settling in `settle_coin`.
    async fn any_open_position(
        &self,
        settle_coin: &str,
    ) -> Result<Option<PositionState>, VenueError>;

    /// Submits an order. `Ok` with `accepted == false` is a venue
    /// rejection.
    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderAck, VenueError>;

    /// Attaches protective exits to an open position.
    async fn attach_bracket(
        &self,
        symbol: &str,
        bracket: &BracketOrder,
    ) -> Result<BracketAck, VenueError>;

    /// Sets account leverage for a symbol.
    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<(), VenueError>;

    /// Rebuilds the venue session after a fault.
    async fn reconnect(&self) -> Result<(), VenueError>;
}
