//! Scan-and-trade loop over the whole watch list.
//!
//! [`ScanRunner`] is the multi-symbol sibling of the single-symbol
//! engine. It enforces one open position across the account: an open
//! position anywhere pauses scanning until it closes, and entries always
//! cross the spread, because a rotating watch list cannot babysit resting
//! limit orders on instruments it may not pick again.

use std::time::Duration;

use band_trade_core::{
    quantize_price, quantize_stop, size_order, AppConfig, EngineState, Lifecycle, OrderRequest,
    OrderType, PolicyKind, PositionState, RiskParameters, TimeInForce, Venue,
};
use band_trade_engine::{attach_with_retry, plan_position_bracket, EngineError};
use band_trade_strategy::{IndicatorParams, SignalEngine};
use chrono::Utc;
use rust_decimal::Decimal;

use crate::scan::{best_opportunity, Opportunity};

/// Decision loop trading the best setup across a watch list.
pub struct ScanRunner<V: Venue> {
    venue: V,
    config: AppConfig,
    risk: RiskParameters,
    signal: SignalEngine,
    params: IndicatorParams,
    state: EngineState,
}

impl<V: Venue> ScanRunner<V> {
    /// Builds the runner from parsed configuration.
    ///
    /// # Errors
    ///
    /// Config values the risk or signal layers reject.
    pub fn new(venue: V, config: AppConfig) -> anyhow::Result<Self> {
        let risk = RiskParameters::from_config(&config.risk)?;
        let signal = SignalEngine::from_config(&config.signal)?;
        let params = IndicatorParams::from_config(&config.signal)?;

        tracing::info!(
            "scanner watching {} symbols ({:?} policy)",
            config.scanner.symbols.len(),
            signal.policy()
        );

        Ok(Self {
            venue,
            config,
            risk,
            signal,
            params,
            state: EngineState::new(),
        })
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn venue(&self) -> &V {
        &self.venue
    }

    /// One pass: protect any open position, otherwise scan and enter.
    ///
    /// # Errors
    ///
    /// Venue faults bubble up for the run loop's backoff path;
    /// quantization faults end the run.
    pub async fn tick(&mut self) -> Result<(), EngineError> {
        let quote = self.config.engine.quote_coin.clone();

        // One position across the whole account at a time.
        if let Some(position) = self.venue.any_open_position(&quote).await? {
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

        if self.state.equity_at_entry.is_some() {
            let equity = self.venue.available_balance(&quote).await?;
            self.state.record_flat(equity);
            tracing::info!(
                "account flat again at equity {}; loss streak {}",
                equity,
                self.state.loss_streak
            );
        }

        if self.state.in_cooldown(Utc::now(), self.risk.cooldown) {
            self.state.lifecycle = Lifecycle::Cooldown;
            return Ok(());
        }

        self.state.lifecycle = Lifecycle::Scanning;
        let Some(opportunity) =
            best_opportunity(&self.venue, &self.config, &self.params, &self.signal).await
        else {
            self.state.lifecycle = Lifecycle::Idle;
            return Ok(());
        };

        self.state.lifecycle = Lifecycle::Sizing;
        let equity = self.venue.available_balance(&quote).await?;
        let Some(request) = self.size(&opportunity, equity)? else {
            self.state.lifecycle = Lifecycle::Idle;
            return Ok(());
        };

        self.state.lifecycle = Lifecycle::EntrySubmitted;
        self.submit(request, equity).await
    }

    /// Polls until cancelled, backing off and reconnecting after venue
    /// faults.
    ///
    /// # Errors
    ///
    /// Only a mid-flight quantization fault ends the loop.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let poll = Duration::from_secs(self.config.engine.poll_secs);
        let backoff = Duration::from_secs(self.config.engine.error_backoff_secs);

        loop {
            match self.tick().await {
                Ok(()) => tokio::time::sleep(poll).await,
                Err(EngineError::Venue(err)) => {
                    self.state.lifecycle = Lifecycle::Faulted;
                    tracing::error!(
                        "scanner venue fault: {}; backing off {}s",
                        err,
                        self.config.engine.error_backoff_secs
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

    /// Fetches rules for the discovered position's symbol and attaches
    /// percent-offset exits.
    async fn bracket_position(&self, position: &PositionState) -> Result<bool, EngineError> {
        let rules = self.venue.instrument_rules(&position.symbol).await?;
        if let Err(err) = rules.validate() {
            // Keep watching; the venue may serve sane rules next tick.
            tracing::error!(
                "{} cannot be bracketed, unusable rules: {}",
                position.symbol,
                err
            );
            return Ok(false);
        }

        let Some(bracket) = plan_position_bracket(position, &rules, &self.risk)? else {
            tracing::warn!(
                "{} open position reports no side; cannot bracket",
                position.symbol
            );
            return Ok(false);
        };

        tracing::info!(
            "{} open without protections; attaching target {} / stop {}",
            position.symbol,
            bracket.take_profit,
            bracket.stop_loss
        );

        let ack = attach_with_retry(
            &self.venue,
            &position.symbol,
            &bracket,
            self.config.engine.bracket_retry_max,
            Duration::from_millis(self.config.engine.bracket_retry_base_ms),
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

    fn size(
        &self,
        opportunity: &Opportunity,
        equity: Decimal,
    ) -> Result<Option<OrderRequest>, EngineError> {
        let entry = quantize_price(opportunity.intent.entry_price, &opportunity.rules)?;
        let stop = quantize_stop(
            opportunity.intent.stop_price,
            opportunity.intent.side,
            &opportunity.rules,
        )?;

        let params = self
            .risk
            .sizing_params(self.state.loss_streak, self.config.engine.leverage);
        let outcome = size_order(equity, entry, stop, &opportunity.rules, &params)?;

        let Some(quantity) = outcome.quantity() else {
            tracing::info!("{} not sized: {:?}", opportunity.symbol, outcome);
            return Ok(None);
        };

        let time_in_force = match self.signal.policy() {
            PolicyKind::Momentum => TimeInForce::ImmediateOrCancel,
            _ => TimeInForce::GoodTilCanceled,
        };
        Ok(Some(OrderRequest {
            symbol: opportunity.symbol.clone(),
            side: opportunity.intent.side,
            order_type: OrderType::Market,
            quantity,
            limit_price: None,
            take_profit: None,
            stop_loss: None,
            time_in_force,
        }))
    }

    async fn submit(&mut self, request: OrderRequest, equity: Decimal) -> Result<(), EngineError> {
        if let Some(leverage) = self.config.engine.leverage {
            self.venue.set_leverage(&request.symbol, leverage).await?;
        }

        let ack = self.venue.submit_order(&request).await?;

        if !ack.accepted {
            // A refusal is final for this scan; the next pass re-ranks.
            tracing::error!(
                "{} entry refused: {}",
                request.symbol,
                ack.error_message.as_deref().unwrap_or("no reason given")
            );
            self.state.lifecycle = Lifecycle::Idle;
            return Ok(());
        }

        self.state.record_entry(Utc::now(), equity);
        self.state.lifecycle = Lifecycle::Bracketed;
        tracing::info!(
            "{} {:?} entry accepted (qty {}, order {})",
            request.symbol,
            request.side,
            request.quantity,
            ack.order_id.as_deref().unwrap_or("?")
        );
        Ok(())
    }
}
