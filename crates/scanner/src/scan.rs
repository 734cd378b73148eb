//! Watch-list evaluation and ranking.
//!
//! Each symbol gets the same treatment the single-symbol engine gives its
//! one instrument: fresh candles, indicator snapshot, signal policy. The
//! candidates that fire are ranked by Bollinger bandwidth, widest first,
//! on the theory that the most volatile instrument pays the most per unit
//! of stop risk. One symbol failing never poisons the rest of the list.

use band_trade_core::{
    AppConfig, CandleSeries, InstrumentRules, TradeIntent, Venue, VenueError,
};
use band_trade_strategy::{band_reference, snapshot, IndicatorParams, Signal, SignalEngine};
use rust_decimal::Decimal;

/// A symbol whose policy fired, with everything needed to size and
/// submit the entry.
#[derive(Debug, Clone)]
pub struct Opportunity {
    pub symbol: String,
    pub intent: TradeIntent,
    /// Bollinger bandwidth at signal time, the ranking key.
    pub bandwidth: Decimal,
    pub rules: InstrumentRules,
}

/// Evaluates one watch-list symbol.
///
/// Returns `None` when the symbol has no usable setup: unusable rules or
/// history, indicators still warming up, or the policy declining. Venue
/// faults surface so the caller can decide whether to skip or abort.
///
/// # Errors
///
/// Any [`VenueError`] from the market-data queries.
pub async fn evaluate_symbol<V: Venue>(
    venue: &V,
    symbol: &str,
    config: &AppConfig,
    params: &IndicatorParams,
    signal: &SignalEngine,
) -> Result<Option<Opportunity>, VenueError> {
    let rules = venue.instrument_rules(symbol).await?;
    if let Err(err) = rules.validate() {
        tracing::warn!("{} has unusable instrument rules: {}", symbol, err);
        return Ok(None);
    }

    let rows = venue
        .candles(symbol, &config.engine.interval, config.engine.candle_limit)
        .await?;
    let series = match CandleSeries::from_newest_first(rows, config.engine.min_candles) {
        Ok(series) => series,
        Err(err) => {
            tracing::debug!("{} candle history unusable: {}", symbol, err);
            return Ok(None);
        }
    };

    let Some(snap) = snapshot(&series, params) else {
        return Ok(None);
    };
    let Some(reference) = band_reference(&series, params) else {
        return Ok(None);
    };

    let last_price = venue.last_price(symbol).await?;

    match signal.evaluate(&snap, &reference, last_price) {
        Signal::Entry(intent) => Ok(Some(Opportunity {
            symbol: symbol.to_string(),
            intent,
            bandwidth: snap.bandwidth(),
            rules,
        })),
        Signal::NoTrade(reason) => {
            tracing::debug!("{} no trade: {}", symbol, reason);
            Ok(None)
        }
    }
}

/// Scans the configured watch list and returns the widest-bandwidth
/// candidate.
///
/// Symbols are tried in list order; a later candidate replaces the best
/// only with strictly greater bandwidth, so ties keep the earlier entry.
/// Per-symbol venue faults are logged and skipped.
pub async fn best_opportunity<V: Venue>(
    venue: &V,
    config: &AppConfig,
    params: &IndicatorParams,
    signal: &SignalEngine,
) -> Option<Opportunity> {
    let mut best: Option<Opportunity> = None;

    for symbol in &config.scanner.symbols {
        let candidate = match evaluate_symbol(venue, symbol, config, params, signal).await {
            Ok(Some(candidate)) => candidate,
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!("{} skipped: {}", symbol, err);
                continue;
            }
        };

        tracing::info!(
            "{} {:?} candidate at {} (bandwidth {})",
            candidate.symbol,
            candidate.intent.side,
            candidate.intent.entry_price,
            candidate.bandwidth
        );

        match &best {
            Some(current) if candidate.bandwidth <= current.bandwidth => {}
            _ => best = Some(candidate),
        }
    }

    if let Some(chosen) = &best {
        tracing::info!(
            "scan picked {} with bandwidth {}",
            chosen.symbol,
            chosen.bandwidth
        );
    }
    best
}
