//! Open position state.

use crate::{OrderSide, Price, Qty};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An open position in a symbol.
///
/// Owned exclusively by the position supervisor; mutated only through
/// open/close operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    /// Buy = long, Sell = short.
    pub side: OrderSide,
    /// Position size (always positive).
    pub qty: Qty,
    /// Average entry price.
    pub entry_price: Price,
    /// Last known market price.
    pub current_price: Price,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    pub fn new(
        symbol: impl Into<String>,
        side: OrderSide,
        qty: Qty,
        entry_price: Price,
        current_price: Price,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            qty,
            entry_price,
            current_price,
            opened_at: Utc::now(),
        }
    }

    /// Unrealized P&L in currency at the given price.
    pub fn unrealized_pnl_at(&self, price: Price) -> Decimal {
        let per_unit = match self.side {
            OrderSide::Buy => price.inner() - self.entry_price.inner(),
            OrderSide::Sell => self.entry_price.inner() - price.inner(),
        };
        per_unit * self.qty.inner()
    }

    /// Unrealized P&L at the last known price.
    pub fn unrealized_pnl(&self) -> Decimal {
        self.unrealized_pnl_at(self.current_price)
    }

    /// Unrealized P&L as a fraction of entry notional at the given price.
    ///
    /// Returns None if the entry price is zero.
    pub fn pnl_fraction_at(&self, price: Price) -> Option<Decimal> {
        if self.entry_price.is_zero() {
            return None;
        }
        let per_unit = match self.side {
            OrderSide::Buy => price.inner() - self.entry_price.inner(),
            OrderSide::Sell => self.entry_price.inner() - price.inner(),
        };
        Some(per_unit / self.entry_price.inner())
    }

    /// Notional value at the given price.
    pub fn notional_at(&self, price: Price) -> Decimal {
        self.qty.notional(price)
    }

    pub fn is_long(&self) -> bool {
        self.side == OrderSide::Buy
    }

    pub fn is_short(&self) -> bool {
        self.side == OrderSide::Sell
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn long_position() -> Position {
        Position::new(
            "AAPL",
            OrderSide::Buy,
            Qty::new(dec!(10)),
            Price::new(dec!(100)),
            Price::new(dec!(100)),
        )
    }

    #[test]
    fn test_long_pnl() {
        let pos = long_position();
        assert_eq!(pos.unrealized_pnl_at(Price::new(dec!(105))), dec!(50));
        assert_eq!(pos.unrealized_pnl_at(Price::new(dec!(95))), dec!(-50));
    }

    #[test]
    fn test_short_pnl() {
        let pos = Position::new(
            "AAPL",
            OrderSide::Sell,
            Qty::new(dec!(10)),
            Price::new(dec!(100)),
            Price::new(dec!(100)),
        );
        assert_eq!(pos.unrealized_pnl_at(Price::new(dec!(95))), dec!(50));
        assert_eq!(pos.unrealized_pnl_at(Price::new(dec!(105))), dec!(-50));
    }

    #[test]
    fn test_pnl_fraction() {
        let pos = long_position();
        assert_eq!(
            pos.pnl_fraction_at(Price::new(dec!(103))).unwrap(),
            dec!(0.03)
        );
        assert_eq!(
            pos.pnl_fraction_at(Price::new(dec!(98))).unwrap(),
            dec!(-0.02)
        );
    }

    #[test]
    fn test_pnl_fraction_zero_entry() {
        let mut pos = long_position();
        pos.entry_price = Price::ZERO;
        assert!(pos.pnl_fraction_at(Price::new(dec!(100))).is_none());
    }
}
