//! Price and quantity alignment to venue step constraints.
//!
//! One rounding mode per value kind: prices round half-up to the tick,
//! quantities round down to the step (never up), and protective stops round
//! toward the entry so rounding can only tighten per-unit risk. A quantized
//! quantity of zero is the "unsizable" sentinel and must never reach the
//! venue.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::QuantizeError;
use crate::instrument::InstrumentRules;
use crate::order::Side;

/// Aligns a price to the instrument tick, rounding half-up.
///
/// # Errors
///
/// [`QuantizeError::InvalidInstrumentRule`] when `tick_size` is not
/// positive.
pub fn quantize_price(value: Decimal, rules: &InstrumentRules) -> Result<Decimal, QuantizeError> {
    if rules.tick_size <= Decimal::ZERO {
        return Err(QuantizeError::InvalidInstrumentRule {
            field: "tick_size",
            value: rules.tick_size,
        });
    }
    let ticks =
        (value / rules.tick_size).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    Ok((ticks * rules.tick_size)
        .round_dp(rules.price_scale)
        .normalize())
}

/// Aligns a quantity to the instrument step, always rounding down.
///
/// # Errors
///
/// [`QuantizeError::InvalidInstrumentRule`] when `qty_step` is not positive.
pub fn quantize_qty(value: Decimal, rules: &InstrumentRules) -> Result<Decimal, QuantizeError> {
    if rules.qty_step <= Decimal::ZERO {
        return Err(QuantizeError::InvalidInstrumentRule {
            field: "qty_step",
            value: rules.qty_step,
        });
    }
    let steps = (value / rules.qty_step).floor();
    Ok((steps * rules.qty_step).normalize())
}

/// Aligns a stop-loss price to the tick, rounding toward the entry.
///
/// A Buy position carries its stop below the entry, so the stop rounds up;
/// a Sell position mirrors this. Either way the rounded stop is never
/// further from the entry than the raw one.
///
/// # Errors
///
/// [`QuantizeError::InvalidInstrumentRule`] when `tick_size` is not
/// positive.
pub fn quantize_stop(
    value: Decimal,
    position_side: Side,
    rules: &InstrumentRules,
) -> Result<Decimal, QuantizeError> {
    if rules.tick_size <= Decimal::ZERO {
        return Err(QuantizeError::InvalidInstrumentRule {
            field: "tick_size",
            value: rules.tick_size,
        });
    }
    let ticks = value / rules.tick_size;
    let ticks = match position_side {
        Side::Buy => ticks.ceil(),
        Side::Sell => ticks.floor(),
    };
    Ok((ticks * rules.tick_size)
        .round_dp(rules.price_scale)
        .normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rules(tick: Decimal, step: Decimal) -> InstrumentRules {
        InstrumentRules {
            tick_size: tick,
            qty_step: step,
            price_scale: 4,
        }
    }

    // ==================== Price Tests ====================

    #[test]
    fn test_price_rounds_half_up() {
        let r = rules(dec!(0.5), dec!(1));
        assert_eq!(quantize_price(dec!(2.24), &r).unwrap(), dec!(2));
        assert_eq!(quantize_price(dec!(2.25), &r).unwrap(), dec!(2.5));
        assert_eq!(quantize_price(dec!(2.26), &r).unwrap(), dec!(2.5));
    }

    #[test]
    fn test_price_already_aligned_unchanged() {
        let r = rules(dec!(0.01), dec!(1));
        assert_eq!(quantize_price(dec!(60000.05), &r).unwrap(), dec!(60000.05));
    }

    #[test]
    fn test_price_is_exact_tick_multiple() {
        let r = rules(dec!(0.0001), dec!(1));
        let q = quantize_price(dec!(0.73218349), &r).unwrap();
        assert_eq!(q % r.tick_size, dec!(0));
    }

    // ==================== Quantity Tests ====================

    #[test]
    fn test_qty_rounds_down() {
        let r = rules(dec!(0.01), dec!(1));
        assert_eq!(quantize_qty(dec!(10.9), &r).unwrap(), dec!(10));

        let r = rules(dec!(0.01), dec!(0.001));
        assert_eq!(quantize_qty(dec!(0.0019), &r).unwrap(), dec!(0.001));
    }

    #[test]
    fn test_qty_never_rounds_up_to_step() {
        // 0.9 of a whole-unit step must become the unsizable sentinel,
        // never 1.
        let r = rules(dec!(0.01), dec!(1));
        assert_eq!(quantize_qty(dec!(0.9), &r).unwrap(), dec!(0));
    }

    #[test]
    fn test_qty_idempotent() {
        let r = rules(dec!(0.01), dec!(0.7));
        let once = quantize_qty(dec!(10.34), &r).unwrap();
        let twice = quantize_qty(once, &r).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_qty_is_exact_step_multiple() {
        let r = rules(dec!(0.01), dec!(0.007));
        let q = quantize_qty(dec!(1.2345), &r).unwrap();
        assert_eq!(q % r.qty_step, dec!(0));
    }

    // ==================== Stop Tests ====================

    #[test]
    fn test_buy_stop_rounds_toward_entry() {
        // Buy stop sits below the entry; ceiling moves it up, toward the
        // entry, never widening risk.
        let r = rules(dec!(0.001), dec!(1));
        assert_eq!(
            quantize_stop(dec!(1.8944), Side::Buy, &r).unwrap(),
            dec!(1.895)
        );
    }

    #[test]
    fn test_sell_stop_rounds_toward_entry() {
        let r = rules(dec!(0.001), dec!(1));
        assert_eq!(
            quantize_stop(dec!(2.1057), Side::Sell, &r).unwrap(),
            dec!(2.105)
        );
    }

    #[test]
    fn test_aligned_stop_unchanged() {
        let r = rules(dec!(0.001), dec!(1));
        assert_eq!(
            quantize_stop(dec!(1.895), Side::Buy, &r).unwrap(),
            dec!(1.895)
        );
        assert_eq!(
            quantize_stop(dec!(1.895), Side::Sell, &r).unwrap(),
            dec!(1.895)
        );
    }

    // ==================== Rule Validation Tests ====================

    #[test]
    fn test_zero_tick_rejected() {
        let r = rules(dec!(0), dec!(1));
        assert!(quantize_price(dec!(2), &r).is_err());
        assert!(quantize_stop(dec!(2), Side::Buy, &r).is_err());
    }

    #[test]
    fn test_negative_step_rejected() {
        let r = rules(dec!(0.5), dec!(-0.1));
        assert!(quantize_qty(dec!(2), &r).is_err());
    }
}
