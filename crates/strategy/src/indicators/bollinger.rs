//! Bollinger bands over close prices.
//!
//! The standard deviation is the SAMPLE deviation (divide by n - 1),
//! matching the rolling stdev of the data pipeline this engine's live
//! behavior was calibrated against. A population deviation would narrow the
//! bands slightly and fire entries the calibrated thresholds never saw.

use rust_decimal::{Decimal, MathematicalOps};

/// One bar's view of the bands.
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub moving_average: Decimal,
    pub upper: Decimal,
    pub lower: Decimal,
}

/// Bands over the trailing `window` closes.
///
/// Returns `None` until the window is full; a sample deviation needs at
/// least two observations.
#[must_use]
pub fn bollinger(closes: &[Decimal], window: usize, k: Decimal) -> Option<BollingerBands> {
    if window < 2 || closes.len() < window {
        return None;
    }
    let tail = &closes[closes.len() - window..];

    let n = Decimal::from(window);
    let mean = tail.iter().copied().sum::<Decimal>() / n;

    let variance = tail
        .iter()
        .map(|close| {
            let d = *close - mean;
            d * d
        })
        .sum::<Decimal>()
        / Decimal::from(window - 1);
    let stdev = variance.sqrt()?;

    Some(BollingerBands {
        moving_average: mean,
        upper: mean + k * stdev,
        lower: mean - k * stdev,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn assert_close(actual: Decimal, expected: Decimal) {
        let tolerance = dec!(0.0001);
        assert!(
            (actual - expected).abs() < tolerance,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_known_window() {
        // Sample stdev of [1, 2, 3, 4] is sqrt(5/3) ~ 1.290994.
        let closes = vec![dec!(1), dec!(2), dec!(3), dec!(4)];
        let bands = bollinger(&closes, 4, dec!(2)).unwrap();

        assert_eq!(bands.moving_average, dec!(2.5));
        assert_close(bands.upper, dec!(5.081988));
        assert_close(bands.lower, dec!(-0.081988));
    }

    #[test]
    fn test_flat_closes_collapse_bands() {
        let closes = vec![dec!(7); 20];
        let bands = bollinger(&closes, 20, dec!(2)).unwrap();

        assert_eq!(bands.upper, bands.lower);
        assert_eq!(bands.moving_average, dec!(7));
    }

    #[test]
    fn test_only_trailing_window_counts() {
        let mut closes = vec![dec!(1000); 30];
        closes.extend(vec![dec!(5); 20]);
        let bands = bollinger(&closes, 20, dec!(2)).unwrap();

        assert_eq!(bands.moving_average, dec!(5));
        assert_eq!(bands.upper, dec!(5));
    }

    #[test]
    fn test_insufficient_data() {
        let closes = vec![dec!(1); 19];
        assert!(bollinger(&closes, 20, dec!(2)).is_none());
        assert!(bollinger(&closes, 1, dec!(2)).is_none());
    }
}
