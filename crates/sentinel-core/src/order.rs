//! Order-related types and identifiers.
//!
//! Provides order side, type, status, bracket specification, and client
//! order ID types for the execution path.

use crate::{Price, Qty};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Returns 1 for buy, -1 for sell (for P&L calculations).
    pub fn sign(&self) -> i8 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Limit order (marketable-limit entry is the engine default).
    Limit,
    /// Market order.
    Market,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit => write!(f, "limit"),
            Self::Market => write!(f, "market"),
        }
    }
}

/// Time-in-force for orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    /// Good for the trading day.
    #[default]
    Day,
    /// Good-til-cancelled.
    Gtc,
    /// Immediate-or-cancel.
    Ioc,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day => write!(f, "day"),
            Self::Gtc => write!(f, "gtc"),
            Self::Ioc => write!(f, "ioc"),
        }
    }
}

/// Broker-side order status.
///
/// Transitions are externally driven; the engine polls until terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Submitted,
    Filled,
    PartiallyFilled,
    Canceled,
    Rejected,
    Expired,
}

impl OrderStatus {
    /// Whether the order can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Canceled | Self::Rejected | Self::Expired)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Submitted => "submitted",
            Self::Filled => "filled",
            Self::PartiallyFilled => "partially_filled",
            Self::Canceled => "canceled",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

/// Client order ID for idempotency.
///
/// Every order submission must carry a unique client ID to prevent
/// duplicate submissions on retries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    /// Create a new unique client order ID.
    ///
    /// Format: `snt_{timestamp_ms}_{uuid_short}`
    pub fn new() -> Self {
        let ts = Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("snt_{ts}_{uuid_short}"))
    }

    /// Create from an existing string (for parsing broker responses).
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ClientOrderId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

/// Attached stop-loss / take-profit legs for a bracket entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketSpec {
    /// Stop-loss trigger price.
    pub stop_loss: Option<Price>,
    /// Take-profit limit price.
    pub take_profit: Option<Price>,
}

impl BracketSpec {
    pub fn new(stop_loss: Option<Price>, take_profit: Option<Price>) -> Self {
        Self {
            stop_loss,
            take_profit,
        }
    }

    /// Whether any protective leg is attached.
    pub fn has_legs(&self) -> bool {
        self.stop_loss.is_some() || self.take_profit.is_some()
    }
}

/// Order submission request sent to a broker connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Client-generated idempotency key.
    pub client_id: ClientOrderId,
    /// Traded symbol.
    pub symbol: String,
    pub side: OrderSide,
    pub qty: Qty,
    pub order_type: OrderType,
    /// Limit price (required for limit orders).
    pub limit_price: Option<Price>,
    pub time_in_force: TimeInForce,
    /// Optional attached stop-loss / take-profit legs.
    pub bracket: Option<BracketSpec>,
}

impl OrderRequest {
    /// Create a plain limit order request.
    pub fn limit(symbol: impl Into<String>, side: OrderSide, qty: Qty, limit_price: Price) -> Self {
        Self {
            client_id: ClientOrderId::new(),
            symbol: symbol.into(),
            side,
            qty,
            order_type: OrderType::Limit,
            limit_price: Some(limit_price),
            time_in_force: TimeInForce::Day,
            bracket: None,
        }
    }

    /// Create a market order request.
    pub fn market(symbol: impl Into<String>, side: OrderSide, qty: Qty) -> Self {
        Self {
            client_id: ClientOrderId::new(),
            symbol: symbol.into(),
            side,
            qty,
            order_type: OrderType::Market,
            limit_price: None,
            time_in_force: TimeInForce::Day,
            bracket: None,
        }
    }

    /// Attach bracket legs, returning the modified request.
    pub fn with_bracket(mut self, bracket: BracketSpec) -> Self {
        self.bracket = Some(bracket);
        self
    }

    /// Strip bracket legs (used for the plain-order fallback).
    pub fn without_bracket(mut self) -> Self {
        self.bracket = None;
        self
    }

    /// Notional value of the request at its limit (or given reference) price.
    pub fn notional(&self, reference: Price) -> rust_decimal::Decimal {
        let px = self.limit_price.unwrap_or(reference);
        self.qty.notional(px)
    }
}

/// Broker-side view of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Broker-assigned order ID.
    pub id: String,
    /// Client-generated idempotency key.
    pub client_id: ClientOrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub qty: Qty,
    pub filled_qty: Qty,
    pub order_type: OrderType,
    pub limit_price: Option<Price>,
    pub status: OrderStatus,
    /// Average fill price, once any quantity has filled.
    pub filled_avg_price: Option<Price>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether the order has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the full quantity has filled.
    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_side_opposite() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }

    #[test]
    fn test_order_side_sign() {
        assert_eq!(OrderSide::Buy.sign(), 1);
        assert_eq!(OrderSide::Sell.sign(), -1);
    }

    #[test]
    fn test_status_terminal() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(OrderStatus::Expired.is_terminal());
        assert!(!OrderStatus::Submitted.is_terminal());
        assert!(!OrderStatus::PartiallyFilled.is_terminal());
    }

    #[test]
    fn test_client_order_id_unique() {
        let id1 = ClientOrderId::new();
        let id2 = ClientOrderId::new();
        assert_ne!(id1, id2);
        assert!(id1.as_str().starts_with("snt_"));
    }

    #[test]
    fn test_request_bracket_strip() {
        let req = OrderRequest::limit("AAPL", OrderSide::Buy, Qty::new(dec!(10)), Price::new(dec!(100)))
            .with_bracket(BracketSpec::new(
                Some(Price::new(dec!(95))),
                Some(Price::new(dec!(110))),
            ));
        assert!(req.bracket.is_some());

        let plain = req.clone().without_bracket();
        assert!(plain.bracket.is_none());
        // Entry parameters preserved
        assert_eq!(plain.limit_price, req.limit_price);
        assert_eq!(plain.qty, req.qty);
    }

    #[test]
    fn test_request_notional() {
        let req = OrderRequest::limit("AAPL", OrderSide::Buy, Qty::new(dec!(10)), Price::new(dec!(100)));
        assert_eq!(req.notional(Price::new(dec!(999))), dec!(1000));
    }
}
