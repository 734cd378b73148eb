//! Wire types for the Bybit v5 REST API.
//!
//! Bybit serves every numeric field as a JSON string and wraps every
//! response in a `retCode`/`retMsg`/`result` envelope. This module owns
//! the raw deserialization shapes and their conversions into the domain
//! types the engine works with.

use band_trade_core::{
    BracketOrder, Candle, InstrumentRules, OrderRequest, OrderType, PositionState, Side,
    TimeInForce, VenueError,
};
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product category for USDT-settled perpetuals.
pub const CATEGORY_LINEAR: &str = "linear";

/// Protective exits trigger off the last traded price, not mark price.
const TRIGGER_LAST_PRICE: &str = "LastPrice";

// =============================================================================
// Response Envelope
// =============================================================================

/// Bybit v5 response envelope.
///
/// `retCode == 0` means the venue accepted the request; any other code is
/// an application-level refusal described by `retMsg`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub ret_code: i64,
    pub ret_msg: String,
    pub result: Option<T>,
}

impl<T> ApiResponse<T> {
    /// True when the venue reported success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.ret_code == 0
    }

    /// Unwraps the payload, turning a non-zero `retCode` into
    /// [`VenueError::Api`].
    ///
    /// # Errors
    ///
    /// [`VenueError::Api`] on a refusal, [`VenueError::Malformed`] when a
    /// successful envelope carries no `result`.
    pub fn into_result(self) -> Result<T, VenueError> {
        if self.ret_code != 0 {
            return Err(VenueError::api(self.ret_code, self.ret_msg));
        }
        self.result
            .ok_or_else(|| VenueError::malformed("retCode 0 but result is missing"))
    }
}

/// Result payload for endpoints that return no data on success.
#[derive(Debug, Clone, Deserialize)]
pub struct EmptyResult {}

// =============================================================================
// Market Data
// =============================================================================

/// `GET /v5/market/instruments-info` result.
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentsInfoResult {
    pub list: Vec<RawInstrument>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInstrument {
    pub symbol: String,
    pub price_scale: Option<String>,
    pub price_filter: Option<RawPriceFilter>,
    pub lot_size_filter: Option<RawLotSizeFilter>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPriceFilter {
    pub tick_size: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLotSizeFilter {
    pub qty_step: Option<String>,
}

impl RawInstrument {
    /// Extracts the quantization rules the engine needs.
    ///
    /// # Errors
    ///
    /// [`VenueError::Malformed`] when the tick size or quantity step is
    /// missing or not numeric. A missing `priceScale` falls back to the
    /// tick size's own decimal places.
    pub fn into_rules(self) -> Result<InstrumentRules, VenueError> {
        let tick_raw = self
            .price_filter
            .as_ref()
            .and_then(|f| f.tick_size.as_deref());
        let step_raw = self
            .lot_size_filter
            .as_ref()
            .and_then(|f| f.qty_step.as_deref());

        let tick_size = require_field(&self.symbol, "priceFilter.tickSize", tick_raw)?;
        let qty_step = require_field(&self.symbol, "lotSizeFilter.qtyStep", step_raw)?;

        let price_scale = match self.price_scale.as_deref().map(str::trim).filter(|s| !s.is_empty())
        {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| VenueError::malformed(format!("priceScale is not an integer: {raw:?}")))?,
            None => tick_size.scale(),
        };

        Ok(InstrumentRules {
            tick_size,
            qty_step,
            price_scale,
        })
    }
}

/// `GET /v5/market/kline` result. Rows are newest first.
#[derive(Debug, Clone, Deserialize)]
pub struct KlineResult {
    pub list: Vec<Vec<String>>,
}

/// Parses one kline row: `[startMs, open, high, low, close, volume, ...]`.
///
/// Returns `None` when the row is short or any field fails to parse;
/// callers drop such rows rather than aborting the whole fetch.
#[must_use]
pub fn parse_kline_row(row: &[String]) -> Option<Candle> {
    if row.len() < 6 {
        return None;
    }
    let millis = row[0].parse::<i64>().ok()?;
    let open_time = Utc.timestamp_millis_opt(millis).single()?;

    Some(Candle {
        open_time,
        open: row[1].parse().ok()?,
        high: row[2].parse().ok()?,
        low: row[3].parse().ok()?,
        close: row[4].parse().ok()?,
        volume: row[5].parse().ok()?,
    })
}

/// `GET /v5/market/tickers` result.
#[derive(Debug, Clone, Deserialize)]
pub struct TickersResult {
    pub list: Vec<RawTicker>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTicker {
    pub symbol: String,
    pub last_price: Option<String>,
}

impl RawTicker {
    /// Last traded price.
    ///
    /// # Errors
    ///
    /// [`VenueError::Malformed`] when `lastPrice` is absent or not numeric.
    pub fn last(&self) -> Result<Decimal, VenueError> {
        match self.last_price.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => parse_decimal("lastPrice", raw),
            None => Err(VenueError::malformed(format!(
                "ticker for {} has no lastPrice",
                self.symbol
            ))),
        }
    }
}

// =============================================================================
// Account Data
// =============================================================================

/// `GET /v5/account/wallet-balance` result.
#[derive(Debug, Clone, Deserialize)]
pub struct WalletBalanceResult {
    pub list: Vec<RawWalletAccount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawWalletAccount {
    #[serde(default)]
    pub coin: Vec<RawCoinBalance>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCoinBalance {
    pub coin: String,
    pub available_balance: Option<String>,
    pub wallet_balance: Option<String>,
}

impl WalletBalanceResult {
    /// Spendable balance for `coin`.
    ///
    /// Unified accounts leave `availableBalance` empty for some account
    /// modes, so this falls back to `walletBalance`. Zero when the coin
    /// row is absent entirely.
    #[must_use]
    pub fn available_for(&self, coin: &str) -> Decimal {
        self.list
            .iter()
            .flat_map(|account| account.coin.iter())
            .find(|entry| entry.coin == coin)
            .and_then(|entry| {
                non_empty_decimal(entry.available_balance.as_deref())
                    .or_else(|| non_empty_decimal(entry.wallet_balance.as_deref()))
            })
            .unwrap_or(Decimal::ZERO)
    }
}

/// `GET /v5/position/list` result.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionListResult {
    pub list: Vec<RawPosition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPosition {
    pub symbol: String,
    pub side: Option<String>,
    pub size: Option<String>,
    pub avg_price: Option<String>,
    pub take_profit: Option<String>,
    pub stop_loss: Option<String>,
}

impl RawPosition {
    /// Converts the venue row into the engine's position snapshot.
    ///
    /// A position counts as bracketed only when both protective levels are
    /// present and non-zero; Bybit reports `""` or `"0"` for unset levels.
    ///
    /// # Errors
    ///
    /// [`VenueError::Malformed`] when `size` or `avgPrice` is not numeric.
    pub fn into_state(self) -> Result<PositionState, VenueError> {
        let size = parse_decimal_or_zero("size", self.size.as_deref())?;
        let avg_entry_price = parse_decimal_or_zero("avgPrice", self.avg_price.as_deref())?;

        let side = match self.side.as_deref() {
            Some("Buy") => Some(Side::Buy),
            Some("Sell") => Some(Side::Sell),
            _ => None,
        };

        let bracketed = protective_level(self.take_profit.as_deref()).is_some()
            && protective_level(self.stop_loss.as_deref()).is_some();

        Ok(PositionState {
            symbol: self.symbol,
            side,
            size,
            avg_entry_price,
            bracketed,
        })
    }
}

// =============================================================================
// Trade Requests
// =============================================================================

/// `POST /v5/order/create` result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreateResult {
    pub order_id: String,
}

/// Body for `POST /v5/order/create`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreateBody {
    pub category: &'static str,
    pub symbol: String,
    pub side: &'static str,
    pub order_type: &'static str,
    pub qty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    pub time_in_force: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<String>,
    /// Always 0: the engine trades in one-way position mode.
    pub position_idx: u8,
}

impl OrderCreateBody {
    #[must_use]
    pub fn from_request(request: &OrderRequest) -> Self {
        Self {
            category: CATEGORY_LINEAR,
            symbol: request.symbol.clone(),
            side: side_str(request.side),
            order_type: order_type_str(request.order_type),
            qty: decimal_str(request.quantity),
            price: request.limit_price.map(decimal_str),
            time_in_force: tif_str(request.time_in_force),
            take_profit: request.take_profit.map(decimal_str),
            stop_loss: request.stop_loss.map(decimal_str),
            position_idx: 0,
        }
    }
}

/// Body for `POST /v5/position/trading-stop`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingStopBody {
    pub category: &'static str,
    pub symbol: String,
    pub take_profit: String,
    pub stop_loss: String,
    pub tp_trigger_by: &'static str,
    pub sl_trigger_by: &'static str,
    /// Always 0: the engine trades in one-way position mode.
    pub position_idx: u8,
}

impl TradingStopBody {
    #[must_use]
    pub fn from_bracket(symbol: &str, bracket: &BracketOrder) -> Self {
        Self {
            category: CATEGORY_LINEAR,
            symbol: symbol.to_string(),
            take_profit: decimal_str(bracket.take_profit),
            stop_loss: decimal_str(bracket.stop_loss),
            tp_trigger_by: TRIGGER_LAST_PRICE,
            sl_trigger_by: TRIGGER_LAST_PRICE,
            position_idx: 0,
        }
    }
}

/// Body for `POST /v5/position/set-leverage`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetLeverageBody {
    pub category: &'static str,
    pub symbol: String,
    pub buy_leverage: String,
    pub sell_leverage: String,
}

impl SetLeverageBody {
    #[must_use]
    pub fn new(symbol: &str, leverage: u32) -> Self {
        let leverage = leverage.to_string();
        Self {
            category: CATEGORY_LINEAR,
            symbol: symbol.to_string(),
            buy_leverage: leverage.clone(),
            sell_leverage: leverage,
        }
    }
}

// =============================================================================
// Parsing Helpers
// =============================================================================

fn side_str(side: Side) -> &'static str {
    match side {
        Side::Buy => "Buy",
        Side::Sell => "Sell",
    }
}

fn order_type_str(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Market => "Market",
        OrderType::Limit => "Limit",
    }
}

fn tif_str(tif: TimeInForce) -> &'static str {
    match tif {
        TimeInForce::GoodTilCanceled => "GTC",
        TimeInForce::PostOnly => "PostOnly",
        TimeInForce::ImmediateOrCancel => "IOC",
    }
}

/// Formats a decimal the way Bybit expects: plain notation, no trailing
/// zeros.
fn decimal_str(value: Decimal) -> String {
    value.normalize().to_string()
}

fn parse_decimal(field: &'static str, raw: &str) -> Result<Decimal, VenueError> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|_| VenueError::malformed(format!("{field} is not a number: {raw:?}")))
}

fn parse_decimal_or_zero(field: &'static str, raw: Option<&str>) -> Result<Decimal, VenueError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => parse_decimal(field, s),
        None => Ok(Decimal::ZERO),
    }
}

fn non_empty_decimal(raw: Option<&str>) -> Option<Decimal> {
    raw.map(str::trim).filter(|s| !s.is_empty())?.parse().ok()
}

/// A protective level is set only when present and strictly positive.
fn protective_level(raw: Option<&str>) -> Option<Decimal> {
    non_empty_decimal(raw).filter(|v| *v > Decimal::ZERO)
}

fn require_field(
    symbol: &str,
    field: &'static str,
    raw: Option<&str>,
) -> Result<Decimal, VenueError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| VenueError::malformed(format!("instrument {symbol} is missing {field}")))?;
    parse_decimal(field, raw)
}
