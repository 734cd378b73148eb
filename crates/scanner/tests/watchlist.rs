//! Watch-list ranking and scan-runner lifecycle tests.
//!
//! The mock venue serves per-symbol fixtures from maps and scripts the
//! account-level calls, so tests can stage multi-symbol races and check
//! which instrument the scanner actually trades.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use band_trade_core::{
    AppConfig, BracketAck, BracketOrder, Candle, InstrumentRules, Lifecycle, OrderAck,
    OrderRequest, OrderType, PolicyKind, PositionState, Side, TimeInForce, Venue, VenueError,
};
use band_trade_scanner::{best_opportunity, ScanRunner};
use band_trade_strategy::{IndicatorParams, SignalEngine};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ==================== Per-Symbol Mock Venue ====================

struct MapVenue {
    rules: HashMap<String, InstrumentRules>,
    candles: HashMap<String, Vec<Candle>>,
    prices: HashMap<String, Decimal>,
    balance: Decimal,
    fail_candles_for: Vec<String>,
    open_positions: Mutex<VecDeque<Option<PositionState>>>,
    submit_results: Mutex<VecDeque<Result<OrderAck, VenueError>>>,
    submitted: Mutex<Vec<OrderRequest>>,
    attached: Mutex<Vec<(String, BracketOrder)>>,
    leverage_set: Mutex<Vec<(String, u32)>>,
}

impl MapVenue {
    fn new() -> Self {
        Self {
            rules: HashMap::new(),
            candles: HashMap::new(),
            prices: HashMap::new(),
            balance: dec!(100),
            fail_candles_for: Vec::new(),
            open_positions: Mutex::new(VecDeque::new()),
            submit_results: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            attached: Mutex::new(Vec::new()),
            leverage_set: Mutex::new(Vec::new()),
        }
    }

    fn with_symbol(mut self, symbol: &str, candles: Vec<Candle>, price: Decimal) -> Self {
        self.rules.insert(
            symbol.to_string(),
            InstrumentRules {
                tick_size: dec!(0.5),
                qty_step: dec!(0.001),
                price_scale: 2,
            },
        );
        self.candles.insert(symbol.to_string(), candles);
        self.prices.insert(symbol.to_string(), price);
        self
    }

    fn with_candle_fault(mut self, symbol: &str) -> Self {
        self.fail_candles_for.push(symbol.to_string());
        self
    }

    fn queue_open_position(self, position: Option<PositionState>) -> Self {
        self.open_positions.lock().push_back(position);
        self
    }

    fn queue_submit(self, result: Result<OrderAck, VenueError>) -> Self {
        self.submit_results.lock().push_back(result);
        self
    }
}

#[async_trait]
impl Venue for MapVenue {
    async fn instrument_rules(&self, symbol: &str) -> Result<InstrumentRules, VenueError> {
        self.rules
            .get(symbol)
            .cloned()
            .ok_or_else(|| VenueError::instrument_unavailable(symbol))
    }

    async fn candles(
        &self,
        symbol: &str,
        _interval: &str,
        _limit: u32,
    ) -> Result<Vec<Candle>, VenueError> {
        if self.fail_candles_for.iter().any(|s| s == symbol) {
            return Err(VenueError::Network("connection reset".to_string()));
        }
        Ok(self.candles.get(symbol).cloned().unwrap_or_default())
    }

    async fn last_price(&self, symbol: &str) -> Result<Decimal, VenueError> {
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| VenueError::instrument_unavailable(symbol))
    }

    async fn available_balance(&self, _coin: &str) -> Result<Decimal, VenueError> {
        Ok(self.balance)
    }

    async fn position(&self, symbol: &str) -> Result<PositionState, VenueError> {
        Ok(PositionState::flat(symbol))
    }

    async fn any_open_position(
        &self,
        _settle_coin: &str,
    ) -> Result<Option<PositionState>, VenueError> {
        Ok(self.open_positions.lock().pop_front().flatten())
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderAck, VenueError> {
        self.submitted.lock().push(request.clone());
        self.submit_results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(OrderAck::accepted("mock-order")))
    }

    async fn attach_bracket(
        &self,
        symbol: &str,
        bracket: &BracketOrder,
    ) -> Result<BracketAck, VenueError> {
        self.attached.lock().push((symbol.to_string(), bracket.clone()));
        Ok(BracketAck::ok())
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<(), VenueError> {
        self.leverage_set.lock().push((symbol.to_string(), leverage));
        Ok(())
    }

    async fn reconnect(&self) -> Result<(), VenueError> {
        Ok(())
    }
}

// ==================== Fixtures ====================

/// Closes alternating around 100 by `amplitude`; wider amplitude means
/// wider bands and a higher bandwidth rank.
fn band_candles(count: usize, amplitude: Decimal) -> Vec<Candle> {
    let base = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
    (0..count)
        .rev()
        .map(|i| {
            let close = if i % 2 == 0 {
                dec!(100) - amplitude
            } else {
                dec!(100) + amplitude
            };
            Candle {
                open_time: base + chrono::Duration::minutes(5 * i as i64),
                open: close,
                high: close + dec!(1),
                low: close - dec!(1),
                close,
                volume: dec!(10),
            }
        })
        .collect()
}

fn open_position(symbol: &str, side: Side, entry: Decimal, bracketed: bool) -> PositionState {
    PositionState {
        symbol: symbol.to_string(),
        side: Some(side),
        size: dec!(0.05),
        avg_entry_price: entry,
        bracketed,
    }
}

fn config(symbols: &[&str]) -> AppConfig {
    let mut config = AppConfig::default();
    config.signal.policy = PolicyKind::Breakout;
    config.engine.bracket_retry_base_ms = 1;
    config.scanner.symbols = symbols.iter().map(|s| s.to_string()).collect();
    config
}

fn strategy_parts(config: &AppConfig) -> (IndicatorParams, SignalEngine) {
    (
        IndicatorParams::from_config(&config.signal).unwrap(),
        SignalEngine::from_config(&config.signal).unwrap(),
    )
}

// ==================== Ranking Tests ====================

#[tokio::test]
async fn test_widest_bandwidth_wins() {
    // Amplitude 5 gives ~0.205 bandwidth, amplitude 8 ~0.328; both break
    // above their upper band at the quoted price.
    let venue = MapVenue::new()
        .with_symbol("ALPHAUSDT", band_candles(60, dec!(5)), dec!(115))
        .with_symbol("BETAUSDT", band_candles(60, dec!(8)), dec!(120));
    let cfg = config(&["ALPHAUSDT", "BETAUSDT"]);
    let (params, signal) = strategy_parts(&cfg);

    let best = best_opportunity(&venue, &cfg, &params, &signal)
        .await
        .unwrap();

    assert_eq!(best.symbol, "BETAUSDT");
    assert_eq!(best.intent.side, Side::Sell);
    assert!(best.bandwidth > dec!(0.3));
}

#[tokio::test]
async fn test_equal_bandwidth_keeps_watchlist_order() {
    let venue = MapVenue::new()
        .with_symbol("ALPHAUSDT", band_candles(60, dec!(5)), dec!(115))
        .with_symbol("BETAUSDT", band_candles(60, dec!(5)), dec!(115));
    let cfg = config(&["ALPHAUSDT", "BETAUSDT"]);
    let (params, signal) = strategy_parts(&cfg);

    let best = best_opportunity(&venue, &cfg, &params, &signal)
        .await
        .unwrap();

    assert_eq!(best.symbol, "ALPHAUSDT");
}

#[tokio::test]
async fn test_faulting_symbol_is_skipped() {
    let venue = MapVenue::new()
        .with_symbol("ALPHAUSDT", band_candles(60, dec!(5)), dec!(115))
        .with_symbol("BETAUSDT", band_candles(60, dec!(8)), dec!(120))
        .with_candle_fault("BETAUSDT");
    let cfg = config(&["ALPHAUSDT", "BETAUSDT"]);
    let (params, signal) = strategy_parts(&cfg);

    let best = best_opportunity(&venue, &cfg, &params, &signal)
        .await
        .unwrap();

    assert_eq!(best.symbol, "ALPHAUSDT");
}

#[tokio::test]
async fn test_unknown_symbol_is_skipped() {
    let venue = MapVenue::new().with_symbol("BETAUSDT", band_candles(60, dec!(8)), dec!(120));
    let cfg = config(&["GHOSTUSDT", "BETAUSDT"]);
    let (params, signal) = strategy_parts(&cfg);

    let best = best_opportunity(&venue, &cfg, &params, &signal)
        .await
        .unwrap();

    assert_eq!(best.symbol, "BETAUSDT");
}

#[tokio::test]
async fn test_no_setup_anywhere_returns_none() {
    // Prices sit inside the bands, so no policy fires.
    let venue = MapVenue::new()
        .with_symbol("ALPHAUSDT", band_candles(60, dec!(5)), dec!(100))
        .with_symbol("BETAUSDT", band_candles(60, dec!(8)), dec!(101));
    let cfg = config(&["ALPHAUSDT", "BETAUSDT"]);
    let (params, signal) = strategy_parts(&cfg);

    let best = best_opportunity(&venue, &cfg, &params, &signal).await;

    assert!(best.is_none());
}

// ==================== Runner Tests ====================

#[tokio::test]
async fn test_runner_trades_the_best_candidate() {
    let venue = MapVenue::new()
        .with_symbol("ALPHAUSDT", band_candles(60, dec!(5)), dec!(115))
        .with_symbol("BETAUSDT", band_candles(60, dec!(8)), dec!(120));
    let mut cfg = config(&["ALPHAUSDT", "BETAUSDT"]);
    cfg.engine.leverage = Some(10);
    let mut runner = ScanRunner::new(venue, cfg).unwrap();

    runner.tick().await.unwrap();

    let submitted = runner.venue().submitted.lock();
    assert_eq!(submitted.len(), 1);
    let request = &submitted[0];
    assert_eq!(request.symbol, "BETAUSDT");
    assert_eq!(request.side, Side::Sell);
    assert_eq!(request.order_type, OrderType::Market);
    assert_eq!(request.time_in_force, TimeInForce::GoodTilCanceled);
    // Equity 100, 1% risk, entry 120 vs stop 121.2 floored to 121.
    assert_eq!(request.quantity, dec!(1));
    drop(submitted);

    // Leverage is applied per symbol, right before the entry.
    assert_eq!(
        runner.venue().leverage_set.lock().as_slice(),
        &[("BETAUSDT".to_string(), 10)]
    );
    assert_eq!(runner.state().lifecycle, Lifecycle::Bracketed);
    assert!(runner.state().last_trade_time.is_some());
}

#[tokio::test]
async fn test_runner_brackets_discovered_position() {
    let venue = MapVenue::new()
        .with_symbol("ETHUSDT", band_candles(60, dec!(5)), dec!(100))
        .queue_open_position(Some(open_position("ETHUSDT", Side::Sell, dec!(2000), false)));
    let cfg = config(&["ETHUSDT"]);
    let mut runner = ScanRunner::new(venue, cfg).unwrap();

    runner.tick().await.unwrap();

    let attached = runner.venue().attached.lock();
    assert_eq!(attached.len(), 1);
    assert_eq!(attached[0].0, "ETHUSDT");
    // Sell at 2000 with default offsets: target 0.5% below, stop 1% above.
    assert_eq!(attached[0].1.take_profit, dec!(1990));
    assert_eq!(attached[0].1.stop_loss, dec!(2020));
    drop(attached);

    assert_eq!(runner.state().lifecycle, Lifecycle::Monitoring);
    assert!(runner.venue().submitted.lock().is_empty());
}

#[tokio::test]
async fn test_runner_monitors_bracketed_position() {
    let venue = MapVenue::new()
        .with_symbol("ETHUSDT", band_candles(60, dec!(5)), dec!(115))
        .queue_open_position(Some(open_position("ETHUSDT", Side::Sell, dec!(2000), true)));
    let cfg = config(&["ETHUSDT"]);
    let mut runner = ScanRunner::new(venue, cfg).unwrap();

    runner.tick().await.unwrap();

    assert_eq!(runner.state().lifecycle, Lifecycle::Monitoring);
    assert!(runner.venue().attached.lock().is_empty());
    assert!(runner.venue().submitted.lock().is_empty());
}

#[tokio::test]
async fn test_runner_cooldown_after_accepted_entry() {
    let venue = MapVenue::new().with_symbol("ALPHAUSDT", band_candles(60, dec!(5)), dec!(115));
    let cfg = config(&["ALPHAUSDT"]);
    let mut runner = ScanRunner::new(venue, cfg).unwrap();

    runner.tick().await.unwrap();
    assert_eq!(runner.venue().submitted.lock().len(), 1);

    // Account reads flat again; the cooldown gate holds.
    runner.tick().await.unwrap();
    assert_eq!(runner.state().lifecycle, Lifecycle::Cooldown);
    assert_eq!(runner.venue().submitted.lock().len(), 1);
}

#[tokio::test]
async fn test_runner_rejected_entry_goes_idle() {
    let venue = MapVenue::new()
        .with_symbol("ALPHAUSDT", band_candles(60, dec!(5)), dec!(115))
        .queue_submit(Ok(OrderAck::rejected("retCode 110007: insufficient balance")));
    let cfg = config(&["ALPHAUSDT"]);
    let mut runner = ScanRunner::new(venue, cfg).unwrap();

    runner.tick().await.unwrap();

    assert_eq!(runner.venue().submitted.lock().len(), 1);
    assert_eq!(runner.state().lifecycle, Lifecycle::Idle);
    assert!(runner.state().last_trade_time.is_none());
}
