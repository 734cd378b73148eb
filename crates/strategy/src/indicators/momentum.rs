//! RSI and VWAP, the inputs of the momentum entry policy.

use band_trade_core::candle::Candle;
use rust_decimal::Decimal;

/// Simple-average RSI over the last `period` close deltas.
///
/// One-sided windows are pinned to the scale ends instead of dividing by
/// zero: when the average loss is zero the RSI is exactly 100, when the
/// average gain is zero it is exactly 0.
#[must_use]
pub fn rsi(closes: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }
    let tail = &closes[closes.len() - (period + 1)..];

    let mut gains = Decimal::ZERO;
    let mut losses = Decimal::ZERO;
    for pair in tail.windows(2) {
        let delta = pair[1] - pair[0];
        if delta > Decimal::ZERO {
            gains += delta;
        } else {
            losses -= delta;
        }
    }

    // Both sides share the period divisor, so it cancels out of the ratio.
    if losses.is_zero() {
        return Some(Decimal::ONE_HUNDRED);
    }
    Some(Decimal::ONE_HUNDRED * gains / (gains + losses))
}

/// Volume-weighted average close over the fetched window.
///
/// Cumulative over the whole window rather than session-anchored; `None`
/// when no volume traded.
#[must_use]
pub fn vwap(bars: &[Candle]) -> Option<Decimal> {
    let mut weighted = Decimal::ZERO;
    let mut volume = Decimal::ZERO;
    for bar in bars {
        weighted += bar.close * bar.volume;
        volume += bar.volume;
    }
    if volume.is_zero() {
        return None;
    }
    Some(weighted / volume)
}
