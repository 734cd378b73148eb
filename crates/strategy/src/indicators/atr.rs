//! Average true range.
//!
//! True range needs the previous close, so the first bar of a series has
//! none and is excluded from the series rather than zero-filled (a zero
//! first sample would drag the average down). The average is a plain
//! rolling mean of the last `period` true ranges, not Wilder's smoothing,
//! matching the reference pipeline the stop distances were tuned on.

use band_trade_core::candle::Candle;
use rust_decimal::Decimal;

/// True range of a bar given the previous close.
#[must_use]
pub fn true_range(bar: &Candle, prev_close: Decimal) -> Decimal {
    let hl = bar.high - bar.low;
    let hc = (bar.high - prev_close).abs();
    let lc = (bar.low - prev_close).abs();
    hl.max(hc).max(lc)
}

/// Rolling-mean ATR over the last `period` true ranges.
///
/// Returns `None` until the series holds `period + 1` bars (the extra bar
/// supplies the first previous close).
#[must_use]
pub fn atr(bars: &[Candle], period: usize) -> Option<Decimal> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }

    let mut ranges = Vec::with_capacity(bars.len() - 1);
    for pair in bars.windows(2) {
        ranges.push(true_range(&pair[1], pair[0].close));
    }

    let tail = &ranges[ranges.len() - period..];
    Some(tail.iter().copied().sum::<Decimal>() / Decimal::from(period))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn bar(minute: u32, high: Decimal, low: Decimal, close: Decimal) -> Candle {
        Candle {
            open_time: Utc.with_ymd_and_hms(2024, 7, 1, 12, minute, 0).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: dec!(10),
        }
    }

    #[test]
    fn test_true_range_picks_dominant_leg() {
        let b = bar(0, dec!(12), dec!(10), dec!(11));
        // Plain range dominates.
        assert_eq!(true_range(&b, dec!(11)), dec!(2));
        // Gap up: distance from previous close dominates.
        assert_eq!(true_range(&b, dec!(7)), dec!(5));
        // Gap down.
        assert_eq!(true_range(&b, dec!(15)), dec!(5));
    }

    #[test]
    fn test_atr_rolling_mean() {
        let bars = vec![
            bar(0, dec!(11), dec!(9), dec!(10)),
            bar(5, dec!(12), dec!(10), dec!(11)), // tr = 2
            bar(10, dec!(11), dec!(10), dec!(10)), // tr = 1
            bar(15, dec!(13), dec!(10), dec!(12)), // tr = 3
        ];
        assert_eq!(atr(&bars, 3).unwrap(), dec!(2));
    }

    #[test]
    fn test_first_bar_contributes_only_its_close() {
        // The first bar's wild high/low never form a true range of their
        // own; only its close seeds the next bar's range.
        let mut bars = vec![bar(0, dec!(100), dec!(0), dec!(50))];
        for minute in 1..=5 {
            bars.push(bar(minute, dec!(51), dec!(49), dec!(50)));
        }
        assert_eq!(atr(&bars, 3).unwrap(), dec!(2));
    }

    #[test]
    fn test_atr_insufficient_data() {
        let bars = vec![
            bar(0, dec!(11), dec!(9), dec!(10)),
            bar(5, dec!(12), dec!(10), dec!(11)),
        ];
        assert!(atr(&bars, 2).is_none());
        assert!(atr(&bars, 0).is_none());
    }
}
