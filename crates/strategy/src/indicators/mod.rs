//! Pure indicator computations over a candle series.
//!
//! Everything here is venue-free and side-effect-free: slices of closes in,
//! values out, `None` until the relevant window is full.

pub mod atr;
pub mod bollinger;
pub mod momentum;

pub use atr::{atr, true_range};
pub use bollinger::{bollinger, BollingerBands};
pub use momentum::{rsi, vwap};

use anyhow::Context;
use band_trade_core::candle::CandleSeries;
use band_trade_core::config::SignalConfig;
use rust_decimal::Decimal;

/// Window and width settings in decimal form, converted once at startup.
#[derive(Debug, Clone)]
pub struct IndicatorParams {
    pub bollinger_window: usize,
    pub bollinger_k: Decimal,
    pub atr_period: usize,
    pub rsi_period: usize,
}

impl IndicatorParams {
    /// Converts the raw config, rejecting windows the indicators cannot
    /// run on.
    ///
    /// # Errors
    ///
    /// Returns an error when a width fails decimal conversion or a window
    /// is out of range.
    pub fn from_config(cfg: &SignalConfig) -> anyhow::Result<Self> {
        let bollinger_k = Decimal::try_from(cfg.bollinger_k).context("bollinger_k")?;
        if cfg.bollinger_window < 2 {
            anyhow::bail!(
                "bollinger_window must be at least 2, got {}",
                cfg.bollinger_window
            );
        }
        if bollinger_k <= Decimal::ZERO {
            anyhow::bail!("bollinger_k must be positive, got {bollinger_k}");
        }
        if cfg.atr_period == 0 || cfg.rsi_period == 0 {
            anyhow::bail!("indicator periods must be positive");
        }
        Ok(Self {
            bollinger_window: cfg.bollinger_window,
            bollinger_k,
            atr_period: cfg.atr_period,
            rsi_period: cfg.rsi_period,
        })
    }
}

/// Indicator values at the latest closed bar.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub moving_average: Decimal,
    pub upper_band: Decimal,
    pub lower_band: Decimal,
    pub atr: Decimal,
    /// `None` until the RSI window fills.
    pub rsi: Option<Decimal>,
    /// `None` when the window traded no volume.
    pub vwap: Option<Decimal>,
}

impl IndicatorSnapshot {
    /// Band width relative to the moving average, the volatility measure
    /// behind the signal gate. Zero when the average is not positive.
    #[must_use]
    pub fn bandwidth(&self) -> Decimal {
        if self.moving_average <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.upper_band - self.lower_band) / self.moving_average
    }
}

/// The previous bar's close and bands, consumed by entry confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct BandReference {
    pub close: Decimal,
    pub upper_band: Decimal,
    pub lower_band: Decimal,
}

/// Snapshot at the latest bar.
///
/// `None` until the Bollinger and ATR windows are both full; RSI and VWAP
/// are optional inputs and stay `None` independently.
#[must_use]
pub fn snapshot(series: &CandleSeries, params: &IndicatorParams) -> Option<IndicatorSnapshot> {
    let closes = series.closes();
    let bands = bollinger(&closes, params.bollinger_window, params.bollinger_k)?;
    let atr_value = atr(series.bars(), params.atr_period)?;

    Some(IndicatorSnapshot {
        moving_average: bands.moving_average,
        upper_band: bands.upper,
        lower_band: bands.lower,
        atr: atr_value,
        rsi: rsi(&closes, params.rsi_period),
        vwap: vwap(series.bars()),
    })
}

/// The bands one bar back, plus that bar's close.
#[must_use]
pub fn band_reference(series: &CandleSeries, params: &IndicatorParams) -> Option<BandReference> {
    let bars = series.bars();
    if bars.len() < 2 {
        return None;
    }
    let prior = &bars[..bars.len() - 1];
    let closes: Vec<Decimal> = prior.iter().map(|c| c.close).collect();
    let bands = bollinger(&closes, params.bollinger_window, params.bollinger_k)?;

    Some(BandReference {
        close: prior[prior.len() - 1].close,
        upper_band: bands.upper,
        lower_band: bands.lower,
    })
}
