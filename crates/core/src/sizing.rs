//! Fixed-fractional position sizing under venue step constraints.
//!
//! The sizer answers one question per entry: how many quantity steps can be
//! bought so that a stop-out loses at most `risk_percent` of equity. Prices
//! handed in must already be quantized, so the risk bound holds exactly on
//! what the venue will see.

use anyhow::Context;
use chrono::Duration;
use rust_decimal::Decimal;

use crate::config::RiskConfig;
use crate::error::QuantizeError;
use crate::instrument::InstrumentRules;
use crate::quantize::quantize_qty;

/// Decimal form of [`RiskConfig`], converted and validated once at startup.
#[derive(Debug, Clone)]
pub struct RiskParameters {
    /// Percent of equity put at risk per trade (1 = 1%).
    pub risk_percent: Decimal,
    /// Equity floor below which no order is sized.
    pub minimum_balance: Decimal,
    /// Take-profit distance as a multiple of the stop distance.
    pub take_profit_multiple: Decimal,
    /// Take-profit offset in percent, for brackets planned off a live
    /// position instead of a fresh signal.
    pub take_profit_percent: Decimal,
    /// Stop-loss offset in percent for the same case.
    pub stop_loss_percent: Decimal,
    /// Re-entry lockout after an accepted entry.
    pub cooldown: Duration,
    /// Loss-streak multiplier base, disabled when `None`.
    pub martingale_factor: Option<Decimal>,
}

impl RiskParameters {
    /// Converts the raw config, rejecting values the sizer cannot work
    /// with.
    ///
    /// # Errors
    ///
    /// Returns an error when a field fails decimal conversion or is out of
    /// range.
    pub fn from_config(cfg: &RiskConfig) -> anyhow::Result<Self> {
        let risk_percent = Decimal::try_from(cfg.risk_percent).context("risk_percent")?;
        let minimum_balance = Decimal::try_from(cfg.minimum_balance).context("minimum_balance")?;
        let take_profit_multiple =
            Decimal::try_from(cfg.take_profit_multiple).context("take_profit_multiple")?;
        let take_profit_percent =
            Decimal::try_from(cfg.take_profit_percent).context("take_profit_percent")?;
        let stop_loss_percent =
            Decimal::try_from(cfg.stop_loss_percent).context("stop_loss_percent")?;
        let martingale_factor = cfg
            .martingale_factor
            .map(Decimal::try_from)
            .transpose()
            .context("martingale_factor")?;

        if risk_percent <= Decimal::ZERO || risk_percent > Decimal::ONE_HUNDRED {
            anyhow::bail!("risk_percent must be in (0, 100], got {risk_percent}");
        }
        if minimum_balance < Decimal::ZERO {
            anyhow::bail!("minimum_balance must not be negative, got {minimum_balance}");
        }
        if take_profit_multiple <= Decimal::ZERO {
            anyhow::bail!("take_profit_multiple must be positive, got {take_profit_multiple}");
        }
        if take_profit_percent <= Decimal::ZERO || stop_loss_percent <= Decimal::ZERO {
            anyhow::bail!("percent bracket offsets must be positive");
        }
        if let Some(factor) = martingale_factor {
            if factor < Decimal::ONE {
                anyhow::bail!("martingale_factor must be at least 1, got {factor}");
            }
        }

        let cooldown_secs = i64::try_from(cfg.cooldown_secs).context("cooldown_secs")?;

        Ok(Self {
            risk_percent,
            minimum_balance,
            take_profit_multiple,
            take_profit_percent,
            stop_loss_percent,
            cooldown: Duration::seconds(cooldown_secs),
            martingale_factor,
        })
    }

    /// Sizing inputs for one attempt at the current loss streak.
    #[must_use]
    pub fn sizing_params(&self, loss_streak: u32, leverage: Option<u32>) -> SizingParams {
        let martingale = self.martingale_factor.map(|factor| MartingaleParams {
            factor,
            loss_streak,
            leverage: Decimal::from(leverage.unwrap_or(1)),
        });
        SizingParams {
            risk_percent: self.risk_percent,
            minimum_balance: self.minimum_balance,
            martingale,
        }
    }
}

/// Inputs for sizing one entry.
#[derive(Debug, Clone)]
pub struct SizingParams {
    pub risk_percent: Decimal,
    pub minimum_balance: Decimal,
    pub martingale: Option<MartingaleParams>,
}

/// Opt-in loss-streak multiplier, notional-capped at equity times leverage.
#[derive(Debug, Clone)]
pub struct MartingaleParams {
    pub factor: Decimal,
    pub loss_streak: u32,
    pub leverage: Decimal,
}

/// Outcome of a sizing attempt.
///
/// Non-`Sized` variants are normal rejections, not faults; callers log
/// them at low severity and skip the entry.
#[derive(Debug, Clone, PartialEq)]
pub enum SizingOutcome {
    Sized(Decimal),
    BelowMinimumBalance { balance: Decimal, minimum: Decimal },
    DegenerateStop { distance: Decimal, tick_size: Decimal },
    Unsizable,
}

impl SizingOutcome {
    #[must_use]
    pub fn quantity(&self) -> Option<Decimal> {
        match self {
            Self::Sized(qty) => Some(*qty),
            _ => None,
        }
    }
}

/// Sizes an entry so a stop-out loses at most the configured equity
/// fraction.
///
/// `entry` and `stop` must already be quantized.
///
/// # Errors
///
/// [`QuantizeError::InvalidInstrumentRule`] when the quantity step is not
/// positive.
pub fn size_order(
    equity: Decimal,
    entry: Decimal,
    stop: Decimal,
    rules: &InstrumentRules,
    params: &SizingParams,
) -> Result<SizingOutcome, QuantizeError> {
    if equity < params.minimum_balance {
        return Ok(SizingOutcome::BelowMinimumBalance {
            balance: equity,
            minimum: params.minimum_balance,
        });
    }

    let per_unit_loss = (entry - stop).abs();
    if per_unit_loss <= rules.tick_size {
        return Ok(SizingOutcome::DegenerateStop {
            distance: per_unit_loss,
            tick_size: rules.tick_size,
        });
    }

    let risk_budget = equity * params.risk_percent / Decimal::ONE_HUNDRED;
    let mut raw = risk_budget / per_unit_loss;

    if let Some(m) = &params.martingale {
        let mut multiplier = Decimal::ONE;
        for _ in 0..m.loss_streak {
            multiplier = match multiplier.checked_mul(m.factor) {
                Some(v) => v,
                None => break,
            };
        }
        raw = match raw.checked_mul(multiplier) {
            Some(v) => v,
            None => raw,
        };
        // Notional may never exceed what the account can margin.
        if entry > Decimal::ZERO {
            let max_qty = equity * m.leverage / entry;
            raw = raw.min(max_qty);
        }
    }

    let qty = quantize_qty(raw, rules)?;
    if qty.is_zero() {
        return Ok(SizingOutcome::Unsizable);
    }
    Ok(SizingOutcome::Sized(qty))
}
