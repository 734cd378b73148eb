//! [`Venue`] implementation backed by the Bybit v5 REST API.
//!
//! Application-level refusals on order placement come back as unaccepted
//! acks so the engine can abort without retrying; refusals on queries and
//! transient codes (rate limit, venue busy) surface as errors and take the
//! engine's backoff path instead.

use async_trait::async_trait;
use band_trade_core::{
    BracketAck, BracketOrder, BybitConfig, Candle, InstrumentRules, OrderAck, OrderRequest,
    PositionState, Venue, VenueError,
};
use rust_decimal::Decimal;

use crate::client::{BybitClient, BybitClientConfig};
use crate::types::{self, OrderCreateBody, SetLeverageBody, TradingStopBody};

/// Bybit reports this code when the requested leverage already matches
/// the current setting; the engine treats it as success.
const LEVERAGE_NOT_MODIFIED: i64 = 110043;

/// Live Bybit venue.
pub struct BybitVenue {
    client: BybitClient,
}

impl BybitVenue {
    /// Creates a venue from a client configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP session cannot be built.
    pub fn new(config: BybitClientConfig) -> Result<Self, VenueError> {
        Ok(Self {
            client: BybitClient::new(config)?,
        })
    }

    /// Creates a venue from the application configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP session cannot be built.
    pub fn from_config(config: &BybitConfig) -> Result<Self, VenueError> {
        Self::new(BybitClientConfig::from(config))
    }

    /// Access to the underlying REST client.
    #[must_use]
    pub fn client(&self) -> &BybitClient {
        &self.client
    }
}

impl std::fmt::Debug for BybitVenue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BybitVenue")
            .field("client", &self.client)
            .finish()
    }
}

#[async_trait]
impl Venue for BybitVenue {
    async fn instrument_rules(&self, symbol: &str) -> Result<InstrumentRules, VenueError> {
        let result = self.client.instruments_info(symbol).await?.into_result()?;

        let raw = result
            .list
            .into_iter()
            .find(|instrument| instrument.symbol == symbol)
            .ok_or_else(|| VenueError::instrument_unavailable(symbol))?;

        raw.into_rules()
    }

    async fn candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, VenueError> {
        let result = self.client.kline(symbol, interval, limit).await?.into_result()?;

        let total = result.list.len();
        let candles: Vec<Candle> = result
            .list
            .iter()
            .filter_map(|row| types::parse_kline_row(row))
            .filter(|candle| candle.is_coherent())
            .collect();

        let dropped = total - candles.len();
        if dropped > 0 {
            tracing::warn!("dropped {} of {} kline rows for {}", dropped, total, symbol);
        }

        Ok(candles)
    }

    async fn last_price(&self, symbol: &str) -> Result<Decimal, VenueError> {
        let result = self.client.tickers(symbol).await?.into_result()?;

        let ticker = result
            .list
            .into_iter()
            .find(|ticker| ticker.symbol == symbol)
            .ok_or_else(|| VenueError::instrument_unavailable(symbol))?;

        ticker.last()
    }

    async fn available_balance(&self, coin: &str) -> Result<Decimal, VenueError> {
        let result = self.client.wallet_balance(coin).await?.into_result()?;
        Ok(result.available_for(coin))
    }

    async fn position(&self, symbol: &str) -> Result<PositionState, VenueError> {
        let result = self.client.position_list(symbol).await?.into_result()?;

        match result.list.into_iter().find(|row| row.symbol == symbol) {
            Some(row) => row.into_state(),
            None => Ok(PositionState::flat(symbol)),
        }
    }

    async fn any_open_position(
        &self,
        settle_coin: &str,
    ) -> Result<Option<PositionState>, VenueError> {
        let result = self
            .client
            .position_list_by_coin(settle_coin)
            .await?
            .into_result()?;

        for row in result.list {
            let state = row.into_state()?;
            if state.is_open() {
                return Ok(Some(state));
            }
        }

        Ok(None)
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderAck, VenueError> {
        let body = OrderCreateBody::from_request(request);
        let response = self.client.order_create(&body).await?;

        if !response.is_ok() {
            let err = VenueError::api(response.ret_code, response.ret_msg.clone());
            if err.is_transient() {
                return Err(err);
            }
            tracing::warn!(
                "order for {} refused with retCode {}: {}",
                request.symbol,
                response.ret_code,
                response.ret_msg
            );
            return Ok(OrderAck::rejected(format!(
                "retCode {}: {}",
                response.ret_code, response.ret_msg
            )));
        }

        let order_id = response
            .result
            .map(|r| r.order_id)
            .ok_or_else(|| VenueError::malformed("accepted order without orderId"))?;

        Ok(OrderAck::accepted(order_id))
    }

    async fn attach_bracket(
        &self,
        symbol: &str,
        bracket: &BracketOrder,
    ) -> Result<BracketAck, VenueError> {
        let body = TradingStopBody::from_bracket(symbol, bracket);
        let response = self.client.trading_stop(&body).await?;

        if !response.is_ok() {
            let err = VenueError::api(response.ret_code, response.ret_msg.clone());
            if err.is_transient() {
                return Err(err);
            }
            tracing::warn!(
                "trading stop for {} refused with retCode {}: {}",
                symbol,
                response.ret_code,
                response.ret_msg
            );
            return Ok(BracketAck::rejected(format!(
                "retCode {}: {}",
                response.ret_code, response.ret_msg
            )));
        }

        Ok(BracketAck::ok())
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<(), VenueError> {
        let body = SetLeverageBody::new(symbol, leverage);
        let response = self.client.set_leverage(&body).await?;

        if response.is_ok() || response.ret_code == LEVERAGE_NOT_MODIFIED {
            return Ok(());
        }

        Err(VenueError::api(response.ret_code, response.ret_msg))
    }

    async fn reconnect(&self) -> Result<(), VenueError> {
        self.client.reconnect()
    }
}
