//! Bybit v5 derivatives integration for the band trading engine.
//!
//! This crate provides:
//! - REST client with HMAC-SHA256 request signing and rate limiting
//! - [`Venue`](band_trade_core::Venue) implementation over USDT-settled
//!   linear perpetuals
//! - Wire types for the v5 `retCode`/`retMsg`/`result` envelope
//!
//! # Example
//!
//! ```ignore
//! use band_trade_bybit::{BybitClientConfig, BybitVenue};
//! use band_trade_core::Venue;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BybitClientConfig::testnet()
//!         .with_api_key(std::env::var("BYBIT_API_KEY")?)
//!         .with_api_secret(std::env::var("BYBIT_API_SECRET")?);
//!     let venue = BybitVenue::new(config)?;
//!
//!     let rules = venue.instrument_rules("BTCUSDT").await?;
//!     println!("tick size: {}", rules.tick_size);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Authentication
//!
//! Signed requests carry `X-BAPI-API-KEY`, `X-BAPI-TIMESTAMP`,
//! `X-BAPI-SIGN`, and `X-BAPI-RECV-WINDOW` headers. The signature is
//! HMAC-SHA256 over `timestamp + api_key + recv_window + payload`, hex
//! encoded. Market-data endpoints are called unauthenticated.
//!
//! # API Endpoints
//!
//! - `GET /v5/market/instruments-info` - Tick size and quantity step
//! - `GET /v5/market/kline` - Candles, newest first
//! - `GET /v5/market/tickers` - Last traded price
//! - `GET /v5/account/wallet-balance` - Available balance
//! - `GET /v5/position/list` - Open positions
//! - `POST /v5/order/create` - Submit order
//! - `POST /v5/position/trading-stop` - Attach take-profit/stop-loss
//! - `POST /v5/position/set-leverage` - Set symbol leverage

pub mod client;
pub mod types;
pub mod venue;

// Re-export main types for convenience
pub use client::{BybitClient, BybitClientConfig, BYBIT_MAINNET_URL, BYBIT_TESTNET_URL};
pub use types::ApiResponse;
pub use venue::BybitVenue;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_exports() {
        let config = BybitClientConfig::default();
        let _ = BybitClient::new(config.clone()).unwrap();
        let _ = BybitVenue::new(config).unwrap();
    }

    #[test]
    fn test_constants_accessible() {
        assert!(BYBIT_MAINNET_URL.starts_with("https://"));
        assert!(BYBIT_TESTNET_URL.starts_with("https://"));
    }
}
