use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::QuantizeError;

/// Venue-imposed precision constraints for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentRules {
    /// Price increment orders must align to.
    pub tick_size: Decimal,
    /// Quantity increment orders must align to.
    pub qty_step: Decimal,
    /// Decimal places the venue quotes prices with.
    pub price_scale: u32,
}

impl InstrumentRules {
    /// Rejects rules a quantizer cannot apply.
    ///
    /// # Errors
    ///
    /// [`QuantizeError::InvalidInstrumentRule`] when either step is zero or
    /// negative.
    pub fn validate(&self) -> Result<(), QuantizeError> {
        if self.tick_size <= Decimal::ZERO {
            return Err(QuantizeError::InvalidInstrumentRule {
                field: "tick_size",
                value: self.tick_size,
            });
        }
        if self.qty_step <= Decimal::ZERO {
            return Err(QuantizeError::InvalidInstrumentRule {
                field: "qty_step",
                value: self.qty_step,
            });
        }
        Ok(())
    }
}
