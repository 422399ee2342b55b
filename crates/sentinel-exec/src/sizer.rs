//! Position sizing.
//!
//! Converts account equity, buying power, and regime into an order
//! quantity. Sizing never fails: any unusable input produces a
//! zero-quantity result, which the orchestrator treats as a skip.

use rust_decimal::Decimal;
use sentinel_core::{AccountSnapshot, Price, Qty, Regime};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sizing limits and scaling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizerConfig {
    /// Base cap: equity fraction committed to one position.
    #[serde(default = "default_max_position_fraction")]
    pub max_position_fraction: Decimal,

    /// Regime multiplier under volatile classification.
    #[serde(default = "default_volatile_scale")]
    pub volatile_scale: Decimal,

    /// Regime multiplier under trending classifications.
    #[serde(default = "default_trending_scale")]
    pub trending_scale: Decimal,

    /// Fraction of buying power usable for one order.
    #[serde(default = "default_buying_power_fraction")]
    pub buying_power_fraction: Decimal,

    /// Whether the instrument accepts fractional quantities.
    #[serde(default)]
    pub fractional: bool,
}

fn default_max_position_fraction() -> Decimal {
    Decimal::new(10, 2) // 0.10
}

fn default_volatile_scale() -> Decimal {
    Decimal::new(5, 1) // 0.5
}

fn default_trending_scale() -> Decimal {
    Decimal::new(125, 2) // 1.25
}

fn default_buying_power_fraction() -> Decimal {
    Decimal::new(90, 2) // 0.90
}

impl Default for SizerConfig {
    fn default() -> Self {
        Self {
            max_position_fraction: default_max_position_fraction(),
            volatile_scale: default_volatile_scale(),
            trending_scale: default_trending_scale(),
            buying_power_fraction: default_buying_power_fraction(),
            fractional: false,
        }
    }
}

/// Sizing outcome, derived fresh each cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingResult {
    /// Order quantity; zero means skip.
    pub qty: Qty,
    /// Notional cap that produced the quantity.
    pub max_value: Decimal,
    pub equity: Price,
    pub buying_power: Price,
    /// Equity fraction actually applied (after the regime scale).
    pub risk_fraction: Decimal,
}

impl SizingResult {
    fn skip() -> Self {
        Self {
            qty: Qty::ZERO,
            max_value: Decimal::ZERO,
            equity: Price::ZERO,
            buying_power: Price::ZERO,
            risk_fraction: Decimal::ZERO,
        }
    }

    /// Whether the result carries a tradable quantity.
    pub fn is_tradable(&self) -> bool {
        self.qty.is_positive()
    }
}

/// Equity- and regime-aware position sizer.
pub struct PositionSizer {
    config: SizerConfig,
}

impl PositionSizer {
    #[must_use]
    pub fn new(config: SizerConfig) -> Self {
        Self { config }
    }

    /// Size an order at the given price.
    ///
    /// A missing or unusable account snapshot, a non-positive price,
    /// or a quantity that floors to zero all return a zero-quantity
    /// result rather than an error.
    pub fn size(
        &self,
        price: Price,
        regime: Option<Regime>,
        account: Option<&AccountSnapshot>,
    ) -> SizingResult {
        let Some(account) = account else {
            debug!("Sizing skipped: no account snapshot");
            return SizingResult::skip();
        };
        if !account.is_usable() || !price.is_positive() {
            debug!(
                equity = %account.equity,
                price = %price,
                "Sizing skipped: unusable inputs"
            );
            return SizingResult::skip();
        }

        let scale = match regime {
            Some(r) if r.is_volatile() => self.config.volatile_scale,
            Some(r) if r.is_trending() => self.config.trending_scale,
            _ => Decimal::ONE,
        };
        let risk_fraction = self.config.max_position_fraction * scale;

        let equity_cap = account.equity.inner() * risk_fraction;
        let bp_cap = account.buying_power.inner() * self.config.buying_power_fraction;
        let max_value = equity_cap.min(bp_cap);

        let mut qty = Qty::new(max_value / price.inner());
        if !self.config.fractional {
            qty = qty.floor_whole();
        }
        if !qty.is_positive() {
            debug!(max_value = %max_value, price = %price, "Sizing skipped: quantity rounds to zero");
            return SizingResult::skip();
        }

        SizingResult {
            qty,
            max_value,
            equity: account.equity,
            buying_power: account.buying_power,
            risk_fraction,
        }
    }
}
