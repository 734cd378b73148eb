//! Single-symbol decision loop.
//!
//! [`TradeEngine`] polls one instrument on a fixed cadence and walks the
//! order lifecycle: read the live position, settle finished round-trips,
//! gate on cooldown, scan for a setup, size it, submit it, and keep open
//! positions protected. The venue is the source of truth for position
//! state on every tick; nothing about fills is cached between passes.

use std::time::Duration;

use anyhow::Context;
use band_trade_core::{
    quantize_price, quantize_stop, size_order, AppConfig, CandleSeries, EngineConfig, EngineState,
    InstrumentRules, Lifecycle, OrderRequest, OrderType, PolicyKind, PositionState, QuantizeError,
    RiskParameters, Side, SizingOutcome, TimeInForce, TradeIntent, Venue, VenueError,
};
use band_trade_strategy::{band_reference, snapshot, IndicatorParams, Signal, SignalEngine};
use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;

/// Failures the decision loop cannot absorb within a tick.
///
/// Venue faults are expected weather; the run loop backs off and
/// reconnects. Quantization faults mean the instrument rules stopped
/// making sense after startup validation, and continuing would mis-price
/// orders, so they end the run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Venue(#[from] VenueError),
    #[error("instrument rules rejected mid-flight: {0}")]
    Quantize(#[from] QuantizeError),
}

/// Decision loop for one symbol against one venue.
pub struct TradeEngine<V: Venue> {
    venue: V,
    config: EngineConfig,
    risk: RiskParameters,
    signal: SignalEngine,
    indicator_params: IndicatorParams,
    rules: InstrumentRules,
    state: EngineState,
}

impl<V: Venue> TradeEngine<V> {
    /// Builds the engine and performs venue startup: fetch and validate
    /// instrument rules, then apply configured leverage.
    ///
    /// # Errors
    ///
    /// Any failure here is fatal; a loop that cannot quantize to real
    /// instrument rules must not start.
    pub async fn start(venue: V, config: &AppConfig) -> anyhow::Result<Self> {
        let risk = RiskParameters::from_config(&config.risk)?;
        let signal = SignalEngine::from_config(&config.signal)?;
        let indicator_params = IndicatorParams::from_config(&config.signal)?;
        let engine_config = config.engine.clone();

        let rules = venue
            .instrument_rules(&engine_config.symbol)
            .await
            .with_context(|| {
                format!(
                    "failed to fetch instrument rules for {}",
                    engine_config.symbol
                )
            })?;
        rules
            .validate()
            .with_context(|| format!("venue returned unusable rules for {}", engine_config.symbol))?;

        if let Some(leverage) = engine_config.leverage {
            venue
                .set_leverage(&engine_config.symbol, leverage)
                .await
                .with_context(|| format!("failed to set {}x leverage", leverage))?;
            tracing::info!("leverage for {} set to {}x", engine_config.symbol, leverage);
        }

        tracing::info!(
            "engine ready for {} ({:?} policy, tick {}, step {})",
            engine_config.symbol,
            signal.policy(),
            rules.tick_size,
            rules.qty_step
        );

        Ok(Self {
            venue,
            config: engine_config,
            risk,
            signal,
            indicator_params,
            rules,
            state: EngineState::new(),
        })
    }

    /// Current lifecycle state, for observers and tests.
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Instrument rules fetched at startup.
    pub fn rules(&self) -> &InstrumentRules {
        &self.rules
    }

    pub fn venue(&self) -> &V {
        &self.venue
    }

    /// One pass of the decision loop.
    ///
    /// # Errors
    ///
    /// Venue faults bubble up so [`run`](Self::run) can back off and
    /// reconnect; quantization faults end the run.
    pub async fn tick(&mut self) -> Result<(), EngineError> {
        let symbol = self.config.symbol.clone();

        // Position truth is re-read every tick, never cached.
        let position = self.venue.position(&symbol).await?;

        if position.is_open() {
            if position.bracketed {
                self.state.lifecycle = Lifecycle::Monitoring;
                return Ok(());
            }
            self.state.lifecycle = Lifecycle::Bracketed;
            if self.bracket_position(&position).await? {
                self.state.lifecycle = Lifecycle::Monitoring;
            }
            return Ok(());
        }

        // Flat. Settle the round-trip if one just finished.
        if self.state.equity_at_entry.is_some() {
            let equity = self.venue.available_balance(&self.config.quote_coin).await?;
            self.state.record_flat(equity);
            tracing::info!(
                "{} flat again at equity {}; loss streak {}",
                symbol,
                equity,
                self.state.loss_streak
            );
        }

        if self.state.in_cooldown(Utc::now(), self.risk.cooldown) {
            self.state.lifecycle = Lifecycle::Cooldown;
            tracing::debug!("{} in re-entry cooldown", symbol);
            return Ok(());
        }

        self.state.lifecycle = Lifecycle::Scanning;
        let Some(intent) = self.scan(&symbol).await? else {
            self.state.lifecycle = Lifecycle::Idle;
            return Ok(());
        };

        self.state.lifecycle = Lifecycle::Sizing;
        let equity = self.venue.available_balance(&self.config.quote_coin).await?;
        let Some(request) = self.size(&symbol, &intent, equity)? else {
            self.state.lifecycle = Lifecycle::Idle;
            return Ok(());
        };

        self.state.lifecycle = Lifecycle::EntrySubmitted;
        self.submit(&symbol, request, equity).await
    }

    /// Polls the venue until the task is cancelled, backing off and
    /// reconnecting after venue faults.
    ///
    /// # Errors
    ///
    /// Only a mid-flight quantization fault ends the loop.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let poll = Duration::from_secs(self.config.poll_secs);
        let backoff = Duration::from_secs(self.config.error_backoff_secs);

        loop {
            match self.tick().await {
                Ok(()) => tokio::time::sleep(poll).await,
                Err(EngineError::Venue(err)) => {
                    self.state.lifecycle = Lifecycle::Faulted;
                    tracing::error!(
                        "{} venue fault: {}; backing off {}s",
                        self.config.symbol,
                        err,
                        self.config.error_backoff_secs
                    );
                    tokio::time::sleep(backoff).await;
                    if let Err(err) = self.venue.reconnect().await {
                        tracing::error!("session rebuild failed: {}", err);
                    }
                    self.state.lifecycle = Lifecycle::Idle;
                }
                Err(err @ EngineError::Quantize(_)) => return Err(err.into()),
            }
        }
    }

    /// Plans and attaches protective exits to a discovered open position.
    ///
    /// Returns whether the bracket is now in place. A refusal leaves the
    /// position unprotected for this tick only; the next position read
    /// still reports it unbracketed and lands back here.
    async fn bracket_position(&self, position: &PositionState) -> Result<bool, EngineError> {
        let Some(bracket) = crate::bracket::plan_position_bracket(position, &self.rules, &self.risk)?
        else {
            tracing::warn!("{} open position reports no side; cannot bracket", position.symbol);
            return Ok(false);
        };

        tracing::info!(
            "{} open without protections; attaching target {} / stop {}",
            position.symbol,
            bracket.take_profit,
            bracket.stop_loss
        );

        let ack = crate::bracket::attach_with_retry(
            &self.venue,
            &position.symbol,
            &bracket,
            self.config.bracket_retry_max,
            Duration::from_millis(self.config.bracket_retry_base_ms),
        )
        .await?;

        if !ack.accepted {
            tracing::error!(
                "{} bracket refused: {}",
                position.symbol,
                ack.error_message.as_deref().unwrap_or("no reason given")
            );
            return Ok(false);
        }
        Ok(true)
    }

    /// Runs indicators and the signal policy over fresh candles.
    async fn scan(&self, symbol: &str) -> Result<Option<TradeIntent>, EngineError> {
        let rows = self
            .venue
            .candles(symbol, &self.config.interval, self.config.candle_limit)
            .await?;

        let series = match CandleSeries::from_newest_first(rows, self.config.min_candles) {
            Ok(series) => series,
            Err(err) => {
                tracing::warn!("{} candle history unusable: {}", symbol, err);
                return Ok(None);
            }
        };

        let Some(snap) = snapshot(&series, &self.indicator_params) else {
            tracing::debug!("{} indicators warming up", symbol);
            return Ok(None);
        };
        let Some(reference) = band_reference(&series, &self.indicator_params) else {
            tracing::debug!("{} reference bands warming up", symbol);
            return Ok(None);
        };

        let last_price = self.venue.last_price(symbol).await?;

        match self.signal.evaluate(&snap, &reference, last_price) {
            Signal::Entry(intent) => {
                tracing::info!(
                    "{} {:?} setup at {} (stop {})",
                    symbol,
                    intent.side,
                    intent.entry_price,
                    intent.stop_price
                );
                Ok(Some(intent))
            }
            Signal::NoTrade(reason) => {
                tracing::debug!("{} no trade: {}", symbol, reason);
                Ok(None)
            }
        }
    }

    /// Quantizes the intent and sizes it against current equity.
    fn size(
        &self,
        symbol: &str,
        intent: &TradeIntent,
        equity: Decimal,
    ) -> Result<Option<OrderRequest>, EngineError> {
        let entry = quantize_price(intent.entry_price, &self.rules)?;
        let stop = quantize_stop(intent.stop_price, intent.side, &self.rules)?;

        let params = self
            .risk
            .sizing_params(self.state.loss_streak, self.config.leverage);
        let outcome = size_order(equity, entry, stop, &self.rules, &params)?;

        let Some(quantity) = outcome.quantity() else {
            log_sizing_rejection(symbol, &outcome);
            return Ok(None);
        };

        Ok(Some(self.build_request(symbol, intent.side, entry, stop, quantity)?))
    }

    /// Shapes the entry order for the active policy.
    ///
    /// Mean reversion rests a post-only limit at the band touch with its
    /// exits embedded, so a fill is protected without a second call.
    /// Breakout and momentum cross the spread with a market order and get
    /// bracketed on the next tick, once the venue reports the fill.
    fn build_request(
        &self,
        symbol: &str,
        side: Side,
        entry: Decimal,
        stop: Decimal,
        quantity: Decimal,
    ) -> Result<OrderRequest, QuantizeError> {
        let request = match self.signal.policy() {
            PolicyKind::MeanReversion => {
                let bracket = crate::bracket::plan_entry_bracket(
                    &TradeIntent {
                        side,
                        entry_price: entry,
                        stop_price: stop,
                    },
                    &self.rules,
                    &self.risk,
                )?;
                OrderRequest {
                    symbol: symbol.to_string(),
                    side,
                    order_type: OrderType::Limit,
                    quantity,
                    limit_price: Some(entry),
                    take_profit: Some(bracket.take_profit),
                    stop_loss: Some(bracket.stop_loss),
                    time_in_force: TimeInForce::PostOnly,
                }
            }
            PolicyKind::Breakout => {
                market_request(symbol, side, quantity, TimeInForce::GoodTilCanceled)
            }
            PolicyKind::Momentum => {
                market_request(symbol, side, quantity, TimeInForce::ImmediateOrCancel)
            }
        };
        Ok(request)
    }

    /// Submits the entry and records the round-trip baseline on
    /// acceptance.
    ///
    /// `equity` is the pre-entry balance; reading it after submission
    /// would fold locked margin into the loss-streak comparison.
    async fn submit(
        &mut self,
        symbol: &str,
        request: OrderRequest,
        equity: Decimal,
    ) -> Result<(), EngineError> {
        let ack = self.venue.submit_order(&request).await?;

        if !ack.accepted {
            // A refusal is final for this signal; never resubmitted.
            tracing::error!(
                "{} entry refused: {}",
                symbol,
                ack.error_message.as_deref().unwrap_or("no reason given")
            );
            self.state.lifecycle = Lifecycle::Idle;
            return Ok(());
        }

        self.state.record_entry(Utc::now(), equity);
        self.state.lifecycle = match request.order_type {
            // Exits ride on the limit order itself; the venue arms them
            // on fill.
            OrderType::Limit => Lifecycle::Monitoring,
            OrderType::Market => Lifecycle::Bracketed,
        };
        tracing::info!(
            "{} {:?} entry accepted (qty {}, order {})",
            symbol,
            request.side,
            request.quantity,
            ack.order_id.as_deref().unwrap_or("?")
        );
        Ok(())
    }
}

fn market_request(
    symbol: &str,
    side: Side,
    quantity: Decimal,
    time_in_force: TimeInForce,
) -> OrderRequest {
    OrderRequest {
        symbol: symbol.to_string(),
        side,
        order_type: OrderType::Market,
        quantity,
        limit_price: None,
        take_profit: None,
        stop_loss: None,
        time_in_force,
    }
}

fn log_sizing_rejection(symbol: &str, outcome: &SizingOutcome) {
    match outcome {
        SizingOutcome::BelowMinimumBalance { balance, minimum } => {
            tracing::info!(
                "{} balance {} under minimum {}; standing down",
                symbol,
                balance,
                minimum
            );
        }
        SizingOutcome::DegenerateStop {
            distance,
            tick_size,
        } => {
            tracing::warn!(
                "{} stop distance {} within one tick ({}); skipping entry",
                symbol,
                distance,
                tick_size
            );
        }
        SizingOutcome::Unsizable => {
            tracing::info!("{} risk budget too small for one quantity step", symbol);
        }
        SizingOutcome::Sized(_) => {}
    }
}
