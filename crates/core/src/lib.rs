pub mod candle;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod instrument;
pub mod order;
pub mod position;
pub mod quantize;
pub mod sizing;
pub mod state;
pub mod traits;

pub use candle::{Candle, CandleSeries};
pub use config::{
    AppConfig, BybitConfig, EngineConfig, PolicyKind, RiskConfig, ScannerConfig, SignalConfig,
};
pub use config_loader::ConfigLoader;
pub use error::{QuantizeError, SeriesError, VenueError};
pub use instrument::InstrumentRules;
pub use order::{
    BracketAck, BracketOrder, OrderAck, OrderRequest, OrderType, Side, TimeInForce, TradeIntent,
};
pub use position::PositionState;
pub use quantize::{quantize_price, quantize_qty, quantize_stop};
pub use sizing::{
    size_order, MartingaleParams, RiskParameters, SizingOutcome, SizingParams,
};
pub use state::{EngineState, Lifecycle};
pub use traits::Venue;
