//! Streaming price ticks.

use chrono::{DateTime, Utc};
use sentinel_core::Price;
use serde::{Deserialize, Serialize};

/// A single streamed price update for one symbol.
///
/// Ticks feed the position supervisor between cycles so exits do not
/// wait for the next full decision cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    pub symbol: String,
    pub price: Price,
    pub timestamp: DateTime<Utc>,
}

impl PriceTick {
    pub fn new(symbol: impl Into<String>, price: Price) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp: Utc::now(),
        }
    }
}
