use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bybit: BybitConfig,
    pub engine: EngineConfig,
    pub risk: RiskConfig,
    pub signal: SignalConfig,
    pub scanner: ScannerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BybitConfig {
    pub api_url: String,
    /// Never committed to a config file; supply via `BAND_TRADE_BYBIT__API_KEY`.
    pub api_key: String,
    pub api_secret: String,
    pub recv_window_ms: u64,
    pub requests_per_second: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub symbol: String,
    /// Kline interval in venue notation (minutes for Bybit: "1", "5", ...).
    pub interval: String,
    pub candle_limit: u32,
    /// Bars required after deduplication before the indicators run.
    pub min_candles: usize,
    pub quote_coin: String,
    pub poll_secs: u64,
    pub error_backoff_secs: u64,
    pub bracket_retry_max: u32,
    pub bracket_retry_base_ms: u64,
    /// Applied once at startup when set.
    pub leverage: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub risk_percent: f64,
    pub minimum_balance: f64,
    /// Take-profit distance as a multiple of the stop distance, for entries
    /// bracketed at submission.
    pub take_profit_multiple: f64,
    /// Percent offsets for brackets planned off an already-open position.
    pub take_profit_percent: f64,
    pub stop_loss_percent: f64,
    pub cooldown_secs: u64,
    /// Loss-streak multiplier; omit to disable martingale sizing.
    pub martingale_factor: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub policy: PolicyKind,
    pub bollinger_window: usize,
    pub bollinger_k: f64,
    pub atr_period: usize,
    /// Band width relative to the moving average, in percent, below which
    /// no entries are generated.
    pub volatility_threshold_pct: f64,
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    /// Price distance from VWAP, in percent, the momentum policy requires.
    pub vwap_band_pct: f64,
    /// Stop offset in percent for policies without an ATR stop.
    pub fixed_stop_pct: f64,
}

/// Which entry policy is active. Policies are never blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    MeanReversion,
    Breakout,
    Momentum,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Watch list, in priority order; earlier symbols win volatility ties.
    pub symbols: Vec<String>,
}

impl Default for BybitConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.bybit.com".to_string(),
            api_key: String::new(),
            api_secret: String::new(),
            recv_window_ms: 5000,
            requests_per_second: 10,
            timeout_secs: 10,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            interval: "5".to_string(),
            candle_limit: 200,
            min_candles: 50,
            quote_coin: "USDT".to_string(),
            poll_secs: 10,
            error_backoff_secs: 60,
            bracket_retry_max: 3,
            bracket_retry_base_ms: 500,
            leverage: None,
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_percent: 1.0,
            minimum_balance: 4.0,
            take_profit_multiple: 2.0,
            take_profit_percent: 0.5,
            stop_loss_percent: 1.0,
            cooldown_secs: 300,
            martingale_factor: None,
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::MeanReversion,
            bollinger_window: 20,
            bollinger_k: 2.0,
            atr_period: 14,
            volatility_threshold_pct: 0.5,
            rsi_period: 14,
            rsi_oversold: 35.0,
            rsi_overbought: 65.0,
            vwap_band_pct: 2.0,
            fixed_stop_pct: 1.0,
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            symbols: vec![
                "BTCUSDT".to_string(),
                "ETHUSDT".to_string(),
                "BNBUSDT".to_string(),
                "SOLUSDT".to_string(),
                "XRPUSDT".to_string(),
                "ADAUSDT".to_string(),
                "DOGEUSDT".to_string(),
                "DOTUSDT".to_string(),
                "WLDUSDT".to_string(),
                "AVAXUSDT".to_string(),
                "1000BONKUSDT".to_string(),
            ],
        }
    }
}
