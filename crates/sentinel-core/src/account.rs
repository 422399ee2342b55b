//! Account snapshot from a broker connector.

use crate::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time account state.
///
/// Fetched fresh each cycle; sizing never reuses a snapshot across
/// cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Total account equity.
    pub equity: Price,
    /// Available buying power.
    pub buying_power: Price,
    /// Settled cash.
    pub cash: Price,
    /// Total portfolio value (equity including open positions).
    pub portfolio_value: Price,
    /// When this snapshot was taken.
    pub fetched_at: DateTime<Utc>,
}

impl AccountSnapshot {
    pub fn new(equity: Price, buying_power: Price, cash: Price, portfolio_value: Price) -> Self {
        Self {
            equity,
            buying_power,
            cash,
            portfolio_value,
            fetched_at: Utc::now(),
        }
    }

    /// Whether the snapshot carries usable numbers.
    pub fn is_usable(&self) -> bool {
        self.equity.is_positive() && self.buying_power.inner() >= rust_decimal::Decimal::ZERO
    }
}
