//! Bybit v5 REST client with request signing and rate limiting.
//!
//! Market-data endpoints are public; account and trade endpoints carry
//! HMAC-SHA256 signatures in `X-BAPI-*` headers. All requests pass through
//! a governor rate limiter sized from configuration.
//!
//! # Example
//!
//! ```ignore
//! use band_trade_bybit::{BybitClient, BybitClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = BybitClient::new(BybitClientConfig::testnet())?;
//!
//!     let klines = client.kline("BTCUSDT", "5", 200).await?.into_result()?;
//!     println!("fetched {} rows", klines.list.len());
//!
//!     Ok(())
//! }
//! ```

use band_trade_core::{BybitConfig, VenueError};
use chrono::Utc;
use governor::{Quota, RateLimiter};
use hmac::{Hmac, Mac};
use nonzero_ext::nonzero;
use parking_lot::RwLock;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::types::{
    ApiResponse, EmptyResult, InstrumentsInfoResult, KlineResult, OrderCreateBody,
    OrderCreateResult, PositionListResult, SetLeverageBody, TickersResult, TradingStopBody,
    WalletBalanceResult, CATEGORY_LINEAR,
};

type HmacSha256 = Hmac<Sha256>;

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

// =============================================================================
// Constants
// =============================================================================

/// Bybit production API base URL.
pub const BYBIT_MAINNET_URL: &str = "https://api.bybit.com";

/// Bybit testnet API base URL.
pub const BYBIT_TESTNET_URL: &str = "https://api-testnet.bybit.com";

/// Account type queried for balances.
const ACCOUNT_TYPE: &str = "UNIFIED";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Bybit client.
#[derive(Debug, Clone)]
pub struct BybitClientConfig {
    /// Base URL for the API.
    pub base_url: String,

    /// API key; empty disables authenticated endpoints.
    pub api_key: String,

    /// API secret used for HMAC signing.
    pub api_secret: String,

    /// Signature validity window in milliseconds.
    pub recv_window_ms: u64,

    /// Requests per second limit.
    pub requests_per_second: NonZeroU32,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BybitClientConfig {
    fn default() -> Self {
        Self {
            base_url: BYBIT_MAINNET_URL.to_string(),
            api_key: String::new(),
            api_secret: String::new(),
            recv_window_ms: 5000,
            requests_per_second: nonzero!(10u32),
            timeout_secs: 10,
        }
    }
}

impl BybitClientConfig {
    /// Creates a configuration for production.
    #[must_use]
    pub fn mainnet() -> Self {
        Self::default()
    }

    /// Creates a configuration for the testnet environment.
    #[must_use]
    pub fn testnet() -> Self {
        Self {
            base_url: BYBIT_TESTNET_URL.to_string(),
            ..Default::default()
        }
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Sets the API secret.
    #[must_use]
    pub fn with_api_secret(mut self, secret: impl Into<String>) -> Self {
        self.api_secret = secret.into();
        self
    }

    /// Sets the rate limit.
    #[must_use]
    pub fn with_rate_limit(mut self, requests_per_second: NonZeroU32) -> Self {
        self.requests_per_second = requests_per_second;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl From<&BybitConfig> for BybitClientConfig {
    fn from(config: &BybitConfig) -> Self {
        Self {
            base_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            recv_window_ms: config.recv_window_ms,
            requests_per_second: NonZeroU32::new(config.requests_per_second)
                .unwrap_or(nonzero!(10u32)),
            timeout_secs: config.timeout_secs,
        }
    }
}

// =============================================================================
// BybitClient
// =============================================================================

/// Bybit v5 REST client.
///
/// The HTTP session sits behind a lock so [`BybitClient::reconnect`] can
/// swap in a fresh one after a transport fault without invalidating
/// outstanding references.
pub struct BybitClient {
    /// Configuration.
    config: BybitClientConfig,

    /// HTTP session, replaceable on reconnect.
    http: RwLock<Client>,

    /// Rate limiter.
    rate_limiter: Arc<DirectRateLimiter>,
}

impl std::fmt::Debug for BybitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BybitClient")
            .field("base_url", &self.config.base_url)
            .field("requests_per_second", &self.config.requests_per_second)
            .finish_non_exhaustive()
    }
}

impl BybitClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP session cannot be built.
    pub fn new(config: BybitClientConfig) -> Result<Self, VenueError> {
        let http = build_http(config.timeout_secs)?;

        let quota = Quota::per_second(config.requests_per_second);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            config,
            http: RwLock::new(http),
            rate_limiter,
        })
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Replaces the HTTP session with a freshly built one.
    ///
    /// # Errors
    ///
    /// Returns an error if the replacement session cannot be built; the
    /// existing session stays in place in that case.
    pub fn reconnect(&self) -> Result<(), VenueError> {
        let fresh = build_http(self.config.timeout_secs)?;
        *self.http.write() = fresh;
        tracing::info!("rebuilt HTTP session");
        Ok(())
    }

    // =========================================================================
    // Signing
    // =========================================================================

    /// Computes the v5 request signature.
    ///
    /// Message format: `{timestamp}{api_key}{recv_window}{payload}` where
    /// `payload` is the query string for GET and the raw JSON body for
    /// POST. The signature is lowercase hex.
    fn sign(&self, timestamp: &str, payload: &str) -> Result<String, VenueError> {
        let message = format!(
            "{}{}{}{}",
            timestamp, self.config.api_key, self.config.recv_window_ms, payload
        );

        let mut mac = HmacSha256::new_from_slice(self.config.api_secret.as_bytes())
            .map_err(|e| VenueError::Authentication(format!("invalid API secret: {e}")))?;
        mac.update(message.as_bytes());

        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Builds the `X-BAPI-*` header set for a signed request.
    fn signed_headers(&self, payload: &str) -> Result<[(&'static str, String); 4], VenueError> {
        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = self.sign(&timestamp, payload)?;

        Ok([
            ("X-BAPI-API-KEY", self.config.api_key.clone()),
            ("X-BAPI-TIMESTAMP", timestamp),
            ("X-BAPI-SIGN", signature),
            ("X-BAPI-RECV-WINDOW", self.config.recv_window_ms.to_string()),
        ])
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// Waits for the rate limiter and makes an unauthenticated GET request.
    async fn get_public<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &str,
    ) -> Result<ApiResponse<T>, VenueError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}?{}", self.config.base_url, path, query);
        tracing::debug!("GET {}", url);

        let http = self.http.read().clone();
        let response = http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(map_send_error)?;

        handle_response(response).await
    }

    /// Waits for the rate limiter and makes a signed GET request.
    async fn get_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &str,
    ) -> Result<ApiResponse<T>, VenueError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}?{}", self.config.base_url, path, query);
        tracing::debug!("GET {}", url);

        let http = self.http.read().clone();
        let mut request = http.get(&url).header("Accept", "application/json");
        for (name, value) in self.signed_headers(query)? {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(map_send_error)?;
        handle_response(response).await
    }

    /// Waits for the rate limiter and makes a signed POST request.
    async fn post_signed<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>, VenueError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.config.base_url, path);
        let body_json = serde_json::to_string(body)
            .map_err(|e| VenueError::malformed(format!("failed to encode request body: {e}")))?;
        tracing::debug!("POST {} body_len={}", url, body_json.len());

        let http = self.http.read().clone();
        let mut request = http
            .post(&url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json");
        for (name, value) in self.signed_headers(&body_json)? {
            request = request.header(name, value);
        }

        let response = request.body(body_json).send().await.map_err(map_send_error)?;
        handle_response(response).await
    }

    // =========================================================================
    // Market Endpoints
    // =========================================================================

    /// Gets instrument metadata for one symbol.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails or the response does not
    /// parse.
    pub async fn instruments_info(
        &self,
        symbol: &str,
    ) -> Result<ApiResponse<InstrumentsInfoResult>, VenueError> {
        let symbol = validate_component("symbol", symbol)?;
        let query = format!("category={CATEGORY_LINEAR}&symbol={symbol}");
        self.get_public("/v5/market/instruments-info", &query).await
    }

    /// Gets kline rows for a symbol, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails or the response does not
    /// parse.
    pub async fn kline(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<ApiResponse<KlineResult>, VenueError> {
        let symbol = validate_component("symbol", symbol)?;
        let interval = validate_component("interval", interval)?;
        let query =
            format!("category={CATEGORY_LINEAR}&symbol={symbol}&interval={interval}&limit={limit}");
        self.get_public("/v5/market/kline", &query).await
    }

    /// Gets the ticker snapshot for one symbol.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails or the response does not
    /// parse.
    pub async fn tickers(&self, symbol: &str) -> Result<ApiResponse<TickersResult>, VenueError> {
        let symbol = validate_component("symbol", symbol)?;
        let query = format!("category={CATEGORY_LINEAR}&symbol={symbol}");
        self.get_public("/v5/market/tickers", &query).await
    }

    // =========================================================================
    // Account Endpoints
    // =========================================================================

    /// Gets the wallet balance for one coin.
    ///
    /// # Errors
    ///
    /// Returns an error if signing or the transport fails.
    pub async fn wallet_balance(
        &self,
        coin: &str,
    ) -> Result<ApiResponse<WalletBalanceResult>, VenueError> {
        let coin = validate_component("coin", coin)?;
        let query = format!("accountType={ACCOUNT_TYPE}&coin={coin}");
        self.get_signed("/v5/account/wallet-balance", &query).await
    }

    /// Gets position rows for one symbol.
    ///
    /// # Errors
    ///
    /// Returns an error if signing or the transport fails.
    pub async fn position_list(
        &self,
        symbol: &str,
    ) -> Result<ApiResponse<PositionListResult>, VenueError> {
        let symbol = validate_component("symbol", symbol)?;
        let query = format!("category={CATEGORY_LINEAR}&symbol={symbol}");
        self.get_signed("/v5/position/list", &query).await
    }

    /// Gets position rows across all symbols settling in `settle_coin`.
    ///
    /// # Errors
    ///
    /// Returns an error if signing or the transport fails.
    pub async fn position_list_by_coin(
        &self,
        settle_coin: &str,
    ) -> Result<ApiResponse<PositionListResult>, VenueError> {
        let settle_coin = validate_component("settleCoin", settle_coin)?;
        let query = format!("category={CATEGORY_LINEAR}&settleCoin={settle_coin}");
        self.get_signed("/v5/position/list", &query).await
    }

    // =========================================================================
    // Trade Endpoints
    // =========================================================================

    /// Submits an order.
    ///
    /// The envelope is returned uninterpreted so callers can distinguish a
    /// venue refusal (`retCode != 0`) from transport failure.
    ///
    /// # Errors
    ///
    /// Returns an error if signing or the transport fails.
    pub async fn order_create(
        &self,
        body: &OrderCreateBody,
    ) -> Result<ApiResponse<OrderCreateResult>, VenueError> {
        self.post_signed("/v5/order/create", body).await
    }

    /// Sets take-profit and stop-loss on an open position.
    ///
    /// # Errors
    ///
    /// Returns an error if signing or the transport fails.
    pub async fn trading_stop(
        &self,
        body: &TradingStopBody,
    ) -> Result<ApiResponse<EmptyResult>, VenueError> {
        self.post_signed("/v5/position/trading-stop", body).await
    }

    /// Sets symbol leverage.
    ///
    /// # Errors
    ///
    /// Returns an error if signing or the transport fails.
    pub async fn set_leverage(
        &self,
        body: &SetLeverageBody,
    ) -> Result<ApiResponse<EmptyResult>, VenueError> {
        self.post_signed("/v5/position/set-leverage", body).await
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn build_http(timeout_secs: u64) -> Result<Client, VenueError> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| VenueError::Network(format!("failed to build HTTP client: {e}")))
}

fn map_send_error(err: reqwest::Error) -> VenueError {
    if err.is_timeout() {
        VenueError::Timeout(err.to_string())
    } else {
        VenueError::Network(err.to_string())
    }
}

async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<ApiResponse<T>, VenueError> {
    let status = response.status();

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(VenueError::Network(format!("HTTP {status}: {text}")));
    }

    response
        .json::<ApiResponse<T>>()
        .await
        .map_err(|e| VenueError::malformed(e.to_string()))
}

/// Validates a value interpolated into a query string.
///
/// Bybit symbols, intervals, and coin names are plain ASCII alphanumerics;
/// anything else would corrupt the query and the signature payload.
fn validate_component<'a>(field: &'static str, value: &'a str) -> Result<&'a str, VenueError> {
    if value.is_empty() {
        return Err(VenueError::malformed(format!("{field} cannot be empty")));
    }

    if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(VenueError::malformed(format!(
            "{field} must be alphanumeric: {value:?}"
        )));
    }

    if value.len() > 32 {
        return Err(VenueError::malformed(format!(
            "{field} exceeds maximum length of 32: {}",
            value.len()
        )));
    }

    Ok(value)
}
