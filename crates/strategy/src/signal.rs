//! Entry signal evaluation.
//!
//! One volatility gate in front of three mutually exclusive entry
//! policies. Evaluation is a pure function of the indicator snapshot, the
//! previous bar's band reference, and the current price; which policy is
//! active is fixed at construction and exposed, never blended.

use std::fmt;

use anyhow::Context;
use band_trade_core::config::{PolicyKind, SignalConfig};
use band_trade_core::order::{Side, TradeIntent};
use rust_decimal::Decimal;

use crate::indicators::{BandReference, IndicatorSnapshot};

/// Why no entry was produced this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoTradeReason {
    LowVolatility,
    NoSetup,
    AlreadyBroken,
    IndicatorWarmup,
}

impl fmt::Display for NoTradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::LowVolatility => "low volatility",
            Self::NoSetup => "no entry setup",
            Self::AlreadyBroken => "band already broken on prior bar",
            Self::IndicatorWarmup => "indicator window not filled",
        };
        f.write_str(reason)
    }
}

/// Evaluation result: exactly one entry intent or a reason not to trade.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Entry(TradeIntent),
    NoTrade(NoTradeReason),
}

/// Configured signal evaluator.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    policy: PolicyKind,
    /// Bandwidth floor as a fraction of the moving average.
    volatility_threshold: Decimal,
    rsi_oversold: Decimal,
    rsi_overbought: Decimal,
    vwap_lower_ratio: Decimal,
    vwap_upper_ratio: Decimal,
    fixed_stop_fraction: Decimal,
}

impl SignalEngine {
    /// Converts the raw config, rejecting thresholds outside their domain.
    ///
    /// # Errors
    ///
    /// Returns an error when a threshold fails decimal conversion or is
    /// out of range.
    pub fn from_config(cfg: &SignalConfig) -> anyhow::Result<Self> {
        let volatility_threshold = Decimal::try_from(cfg.volatility_threshold_pct)
            .context("volatility_threshold_pct")?
            / Decimal::ONE_HUNDRED;
        let rsi_oversold = Decimal::try_from(cfg.rsi_oversold).context("rsi_oversold")?;
        let rsi_overbought = Decimal::try_from(cfg.rsi_overbought).context("rsi_overbought")?;
        let vwap_band =
            Decimal::try_from(cfg.vwap_band_pct).context("vwap_band_pct")? / Decimal::ONE_HUNDRED;
        let fixed_stop_fraction =
            Decimal::try_from(cfg.fixed_stop_pct).context("fixed_stop_pct")? / Decimal::ONE_HUNDRED;

        if volatility_threshold < Decimal::ZERO {
            anyhow::bail!("volatility_threshold_pct must not be negative");
        }
        if rsi_oversold >= rsi_overbought {
            anyhow::bail!(
                "rsi_oversold ({rsi_oversold}) must be below rsi_overbought ({rsi_overbought})"
            );
        }
        if vwap_band <= Decimal::ZERO || vwap_band >= Decimal::ONE {
            anyhow::bail!("vwap_band_pct must be in (0, 100)");
        }
        if fixed_stop_fraction <= Decimal::ZERO {
            anyhow::bail!("fixed_stop_pct must be positive");
        }

        Ok(Self {
            policy: cfg.policy,
            volatility_threshold,
            rsi_oversold,
            rsi_overbought,
            vwap_lower_ratio: Decimal::ONE - vwap_band,
            vwap_upper_ratio: Decimal::ONE + vwap_band,
            fixed_stop_fraction,
        })
    }

    /// The active entry policy.
    #[must_use]
    pub fn policy(&self) -> PolicyKind {
        self.policy
    }

    /// Evaluates one tick.
    #[must_use]
    pub fn evaluate(
        &self,
        snapshot: &IndicatorSnapshot,
        reference: &BandReference,
        last_price: Decimal,
    ) -> Signal {
        if snapshot.bandwidth() < self.volatility_threshold {
            return Signal::NoTrade(NoTradeReason::LowVolatility);
        }
        match self.policy {
            PolicyKind::MeanReversion => self.mean_reversion(snapshot, reference, last_price),
            PolicyKind::Breakout => self.breakout(snapshot, last_price),
            PolicyKind::Momentum => self.momentum(snapshot, last_price),
        }
    }

    fn mean_reversion(
        &self,
        snap: &IndicatorSnapshot,
        reference: &BandReference,
        price: Decimal,
    ) -> Signal {
        if price < snap.lower_band {
            // Entry only on the bar that crossed the band; a prior close
            // already at or below its band means the move is stale.
            if reference.close <= reference.lower_band {
                return Signal::NoTrade(NoTradeReason::AlreadyBroken);
            }
            return Signal::Entry(TradeIntent {
                side: Side::Buy,
                entry_price: price,
                stop_price: price - snap.atr,
            });
        }
        if price > snap.upper_band {
            if reference.close >= reference.upper_band {
                return Signal::NoTrade(NoTradeReason::AlreadyBroken);
            }
            return Signal::Entry(TradeIntent {
                side: Side::Sell,
                entry_price: price,
                stop_price: price + snap.atr,
            });
        }
        Signal::NoTrade(NoTradeReason::NoSetup)
    }

    fn breakout(&self, snap: &IndicatorSnapshot, price: Decimal) -> Signal {
        if price >= snap.upper_band {
            return self.fixed_stop_intent(Side::Sell, price);
        }
        if price <= snap.lower_band {
            return self.fixed_stop_intent(Side::Buy, price);
        }
        Signal::NoTrade(NoTradeReason::NoSetup)
    }

    fn momentum(&self, snap: &IndicatorSnapshot, price: Decimal) -> Signal {
        let Some(rsi) = snap.rsi else {
            return Signal::NoTrade(NoTradeReason::IndicatorWarmup);
        };
        let Some(vwap) = snap.vwap.filter(|v| *v > Decimal::ZERO) else {
            return Signal::NoTrade(NoTradeReason::IndicatorWarmup);
        };

        let ratio = price / vwap;
        if rsi < self.rsi_oversold && ratio < self.vwap_lower_ratio {
            return self.fixed_stop_intent(Side::Buy, price);
        }
        if rsi > self.rsi_overbought && ratio > self.vwap_upper_ratio {
            return self.fixed_stop_intent(Side::Sell, price);
        }
        Signal::NoTrade(NoTradeReason::NoSetup)
    }

    fn fixed_stop_intent(&self, side: Side, price: Decimal) -> Signal {
        let offset = price * self.fixed_stop_fraction;
        let stop_price = match side {
            Side::Buy => price - offset,
            Side::Sell => price + offset,
        };
        Signal::Entry(TradeIntent {
            side,
            entry_price: price,
            stop_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn engine(policy: PolicyKind) -> SignalEngine {
        let cfg = SignalConfig {
            policy,
            ..SignalConfig::default()
        };
        SignalEngine::from_config(&cfg).unwrap()
    }

    fn wide_snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            moving_average: dec!(100),
            upper_band: dec!(110),
            lower_band: dec!(90),
            atr: dec!(3),
            rsi: Some(dec!(50)),
            vwap: Some(dec!(100)),
        }
    }

    fn inside_reference() -> BandReference {
        BandReference {
            close: dec!(100),
            upper_band: dec!(110),
            lower_band: dec!(90),
        }
    }

    // ==================== Volatility Gate ====================

    #[test]
    fn test_gate_rejects_narrow_bands() {
        // Bandwidth 0.002 under the default 0.005 threshold; the breach
        // below the band must not matter.
        let snap = IndicatorSnapshot {
            moving_average: dec!(100),
            upper_band: dec!(100.1),
            lower_band: dec!(99.9),
            atr: dec!(1),
            rsi: Some(dec!(10)),
            vwap: Some(dec!(100)),
        };
        let signal = engine(PolicyKind::MeanReversion).evaluate(
            &snap,
            &inside_reference(),
            dec!(99),
        );
        assert_eq!(signal, Signal::NoTrade(NoTradeReason::LowVolatility));
    }

    #[test]
    fn test_gate_rejects_collapsed_bands() {
        // Twenty equal closes collapse the bands to zero width.
        let snap = IndicatorSnapshot {
            moving_average: dec!(7),
            upper_band: dec!(7),
            lower_band: dec!(7),
            atr: dec!(0),
            rsi: Some(dec!(100)),
            vwap: Some(dec!(7)),
        };
        let signal =
            engine(PolicyKind::MeanReversion).evaluate(&snap, &inside_reference(), dec!(6));
        assert_eq!(signal, Signal::NoTrade(NoTradeReason::LowVolatility));
    }

    // ==================== Mean Reversion ====================

    #[test]
    fn test_reversion_buy_on_fresh_downward_cross() {
        let signal = engine(PolicyKind::MeanReversion).evaluate(
            &wide_snapshot(),
            &inside_reference(),
            dec!(89),
        );
        assert_eq!(
            signal,
            Signal::Entry(TradeIntent {
                side: Side::Buy,
                entry_price: dec!(89),
                stop_price: dec!(86),
            })
        );
    }

    #[test]
    fn test_reversion_sell_on_fresh_upward_cross() {
        let signal = engine(PolicyKind::MeanReversion).evaluate(
            &wide_snapshot(),
            &inside_reference(),
            dec!(111),
        );
        assert_eq!(
            signal,
            Signal::Entry(TradeIntent {
                side: Side::Sell,
                entry_price: dec!(111),
                stop_price: dec!(114),
            })
        );
    }

    #[test]
    fn test_reversion_rejects_already_broken_band() {
        // Previous close already at or below its lower band: stale move.
        let reference = BandReference {
            close: dec!(89.5),
            upper_band: dec!(110),
            lower_band: dec!(90),
        };
        let signal =
            engine(PolicyKind::MeanReversion).evaluate(&wide_snapshot(), &reference, dec!(89));
        assert_eq!(signal, Signal::NoTrade(NoTradeReason::AlreadyBroken));
    }

    #[test]
    fn test_reversion_prior_close_on_band_counts_as_broken() {
        let reference = BandReference {
            close: dec!(90),
            upper_band: dec!(110),
            lower_band: dec!(90),
        };
        let signal =
            engine(PolicyKind::MeanReversion).evaluate(&wide_snapshot(), &reference, dec!(89));
        assert_eq!(signal, Signal::NoTrade(NoTradeReason::AlreadyBroken));
    }

    #[test]
    fn test_reversion_inside_bands_is_no_setup() {
        let signal = engine(PolicyKind::MeanReversion).evaluate(
            &wide_snapshot(),
            &inside_reference(),
            dec!(100),
        );
        assert_eq!(signal, Signal::NoTrade(NoTradeReason::NoSetup));
    }

    // ==================== Breakout ====================

    #[test]
    fn test_breakout_sell_at_upper_band_inclusive() {
        let signal =
            engine(PolicyKind::Breakout).evaluate(&wide_snapshot(), &inside_reference(), dec!(110));
        let Signal::Entry(intent) = signal else {
            panic!("expected entry");
        };
        assert_eq!(intent.side, Side::Sell);
        assert_eq!(intent.entry_price, dec!(110));
        // Default 1% fixed stop.
        assert_eq!(intent.stop_price, dec!(111.1));
    }

    #[test]
    fn test_breakout_buy_at_lower_band_without_confirmation() {
        // The reference bar is already outside its band; breakout mode
        // must not care.
        let reference = BandReference {
            close: dec!(85),
            upper_band: dec!(110),
            lower_band: dec!(90),
        };
        let signal =
            engine(PolicyKind::Breakout).evaluate(&wide_snapshot(), &reference, dec!(88));
        let Signal::Entry(intent) = signal else {
            panic!("expected entry");
        };
        assert_eq!(intent.side, Side::Buy);
        assert_eq!(intent.stop_price, dec!(87.12));
    }

    // ==================== Momentum ====================

    #[test]
    fn test_momentum_buy_needs_both_conditions() {
        let mut snap = wide_snapshot();
        snap.rsi = Some(dec!(30));
        snap.vwap = Some(dec!(100));

        // RSI oversold but price not far enough under VWAP.
        let signal =
            engine(PolicyKind::Momentum).evaluate(&snap, &inside_reference(), dec!(99));
        assert_eq!(signal, Signal::NoTrade(NoTradeReason::NoSetup));

        // Both conditions met: price 97 is under the 0.98 ratio.
        let signal =
            engine(PolicyKind::Momentum).evaluate(&snap, &inside_reference(), dec!(97));
        let Signal::Entry(intent) = signal else {
            panic!("expected entry");
        };
        assert_eq!(intent.side, Side::Buy);
    }

    #[test]
    fn test_momentum_sell_above_vwap_when_overbought() {
        let mut snap = wide_snapshot();
        snap.rsi = Some(dec!(70));
        snap.vwap = Some(dec!(100));

        let signal =
            engine(PolicyKind::Momentum).evaluate(&snap, &inside_reference(), dec!(103));
        let Signal::Entry(intent) = signal else {
            panic!("expected entry");
        };
        assert_eq!(intent.side, Side::Sell);
        assert_eq!(intent.stop_price, dec!(104.03));
    }

    #[test]
    fn test_momentum_waits_for_indicator_warmup() {
        let mut snap = wide_snapshot();
        snap.rsi = None;

        let signal =
            engine(PolicyKind::Momentum).evaluate(&snap, &inside_reference(), dec!(97));
        assert_eq!(signal, Signal::NoTrade(NoTradeReason::IndicatorWarmup));
    }

    // ==================== Config ====================

    #[test]
    fn test_active_policy_is_exposed() {
        assert_eq!(engine(PolicyKind::Breakout).policy(), PolicyKind::Breakout);
    }

    #[test]
    fn test_from_config_rejects_crossed_rsi_thresholds() {
        let cfg = SignalConfig {
            rsi_oversold: 70.0,
            rsi_overbought: 30.0,
            ..SignalConfig::default()
        };
        assert!(SignalEngine::from_config(&cfg).is_err());
    }
}
