//! Protective exit planning and attachment.
//!
//! A bracket pairs one take-profit with one stop-loss. Fresh entries get
//! theirs from the signal's stop distance; positions discovered already
//! open (after a restart or a partial submission) fall back to percent
//! offsets from the average entry, because the original stop distance is
//! gone with the process that computed it.

use std::time::Duration;

use band_trade_core::{
    quantize_price, quantize_stop, BracketAck, BracketOrder, InstrumentRules, PositionState,
    QuantizeError, RiskParameters, Side, TradeIntent, Venue, VenueError,
};
use rust_decimal::Decimal;

/// Plans protective exits for a fresh entry intent.
///
/// The take-profit sits `take_profit_multiple` stop-distances beyond the
/// entry. Both levels land on the tick grid, the stop rounding toward the
/// entry so alignment can only tighten per-unit risk.
///
/// # Errors
///
/// [`QuantizeError::InvalidInstrumentRule`] when the rules carry a
/// non-positive tick.
pub fn plan_entry_bracket(
    intent: &TradeIntent,
    rules: &InstrumentRules,
    risk: &RiskParameters,
) -> Result<BracketOrder, QuantizeError> {
    let distance = (intent.entry_price - intent.stop_price).abs();
    let offset = distance * risk.take_profit_multiple;
    let take_profit = match intent.side {
        Side::Buy => intent.entry_price + offset,
        Side::Sell => intent.entry_price - offset,
    };
    Ok(BracketOrder {
        take_profit: quantize_price(take_profit, rules)?,
        stop_loss: quantize_stop(intent.stop_price, intent.side, rules)?,
    })
}

/// Plans protective exits for an already-open position using percent
/// offsets from its average entry price.
///
/// Returns `None` when the position reports no side; such a row cannot be
/// bracketed and the caller decides what to log.
///
/// # Errors
///
/// [`QuantizeError::InvalidInstrumentRule`] when the rules carry a
/// non-positive tick.
pub fn plan_position_bracket(
    position: &PositionState,
    rules: &InstrumentRules,
    risk: &RiskParameters,
) -> Result<Option<BracketOrder>, QuantizeError> {
    let Some(side) = position.side else {
        return Ok(None);
    };
    let entry = position.avg_entry_price;
    let profit_offset = entry * risk.take_profit_percent / Decimal::ONE_HUNDRED;
    let stop_offset = entry * risk.stop_loss_percent / Decimal::ONE_HUNDRED;
    let (take_profit, stop_loss) = match side {
        Side::Buy => (entry + profit_offset, entry - stop_offset),
        Side::Sell => (entry - profit_offset, entry + stop_offset),
    };
    Ok(Some(BracketOrder {
        take_profit: quantize_price(take_profit, rules)?,
        stop_loss: quantize_stop(stop_loss, side, rules)?,
    }))
}

/// Attaches a bracket, retrying transient faults with a doubling delay.
///
/// Only transport-level faults retry. A venue refusal comes back as the
/// unaccepted ack on the first attempt; the position stays open either
/// way, so the caller lands back here on its next pass.
///
/// # Errors
///
/// The last [`VenueError`] once `max_attempts` transient faults have been
/// burned, or immediately for a non-transient fault.
pub async fn attach_with_retry<V: Venue>(
    venue: &V,
    symbol: &str,
    bracket: &BracketOrder,
    max_attempts: u32,
    base_delay: Duration,
) -> Result<BracketAck, VenueError> {
    let mut delay = base_delay;
    let mut attempt = 1;
    loop {
        match venue.attach_bracket(symbol, bracket).await {
            Ok(ack) => return Ok(ack),
            Err(err) if err.is_transient() && attempt < max_attempts => {
                tracing::warn!(
                    "bracket attach for {} failed (attempt {}/{}): {}; retrying in {:?}",
                    symbol,
                    attempt,
                    max_attempts,
                    err,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
